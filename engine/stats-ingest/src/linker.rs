//! Summary row projection
//!
//! Summary rows are a read model derived from the detail documents. They can
//! be rebuilt from the stored season entry at any time and are never read back
//! as a source for merging.

use crate::error::{PipelineError, Result};
use crate::models::*;
use crate::resolver::ResolvedPlayer;
use crate::store::StatsStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Counting stat per game; zero when no games were played
pub fn per_game(total: f64, games: u32) -> f64 {
    if games == 0 {
        0.0
    } else {
        total / games as f64
    }
}

/// Made/attempted ratio; zero when nothing was attempted
pub fn pct(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        0.0
    } else {
        made as f64 / attempted as f64
    }
}

pub fn project_nba(totals: &NbaTotals) -> NbaSummaryStats {
    let g = totals.games;
    NbaSummaryStats {
        games_played: g,
        minutes_per_game: per_game(totals.minutes as f64, g),
        points_per_game: per_game(totals.points as f64, g),
        rebounds_per_game: per_game(totals.total_rebounds as f64, g),
        assists_per_game: per_game(totals.assists as f64, g),
        steals_per_game: per_game(totals.steals as f64, g),
        blocks_per_game: per_game(totals.blocks as f64, g),
        turnovers_per_game: per_game(totals.turnovers as f64, g),
        field_goal_pct: pct(totals.field_goals, totals.field_goal_attempts),
        three_point_pct: pct(totals.three_pointers, totals.three_point_attempts),
        free_throw_pct: pct(totals.free_throws, totals.free_throw_attempts),
    }
}

pub fn project_nfl(totals: &NflTotals) -> NflSummaryStats {
    let g = totals.games;
    NflSummaryStats {
        games_played: g,
        passing_yards_per_game: per_game(totals.passing_yards as f64, g),
        rushing_yards_per_game: per_game(totals.rushing_yards as f64, g),
        receiving_yards_per_game: per_game(totals.receiving_yards as f64, g),
        receptions_per_game: per_game(totals.receptions as f64, g),
        total_touchdowns: totals.passing_touchdowns + totals.rushing_touchdowns + totals.receiving_touchdowns,
        fantasy_points_per_game: per_game(totals.fantasy_points, g),
    }
}

pub fn project_soccer(stats: &SoccerSeasonStats) -> SoccerSummaryStats {
    let g = stats.appearances;
    SoccerSummaryStats {
        games_played: g,
        minutes: stats.minutes,
        goals: stats.goals.total,
        assists: stats.goals.assists,
        yellow_cards: stats.cards.yellow,
        red_cards: stats.cards.red,
        goals_per_game: per_game(stats.goals.total as f64, g),
        assists_per_game: per_game(stats.goals.assists as f64, g),
        minutes_per_game: per_game(stats.minutes as f64, g),
    }
}

/// Keeps summary rows pointed at their detail documents
pub struct SummaryLinker {
    store: Arc<dyn StatsStore>,
}

impl SummaryLinker {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Project the regular-phase entry for `season` onto the player's summary
    /// row, creating the row on first sight.
    pub async fn link(&self, detail: &PlayerSeasonStats, season: i32, now: DateTime<Utc>) -> Result<PlayerSummary> {
        let (team, position, age, stats) = match &detail.history {
            SeasonHistory::Nba { .. } => {
                let entry = detail.nba_entry(season, Phase::Regular).ok_or_else(|| missing_entry(detail, season))?;
                let stats = entry.totals.as_ref().map(|t| SummaryStats::Nba(project_nba(t)));
                (entry.team.clone(), entry.position.clone(), entry.age, stats)
            }
            SeasonHistory::Soccer { .. } => {
                let entry = detail.soccer_entry(season).ok_or_else(|| missing_entry(detail, season))?;
                let stats = entry.stats.as_ref().map(|s| SummaryStats::Soccer(project_soccer(s)));
                (entry.team.clone(), entry.position.clone(), entry.age, stats)
            }
        };

        let mut summary = self
            .store
            .get_player(detail.league, &detail.player_id)
            .await?
            .unwrap_or_else(|| PlayerSummary::new(detail.league, &detail.player_id, &detail.name, now));

        summary.name = detail.name.clone();
        summary.detail_ref = Some(detail.key());
        summary.team_id = team;
        if position.is_some() {
            summary.position = position;
        }
        if age.is_some() {
            summary.age = age;
        }
        if stats.is_some() {
            summary.stats = stats;
        }
        summary.last_updated = now;

        self.store.upsert_player(&summary).await?;
        debug!(league = %detail.league, player_id = %detail.player_id, season, "Linked summary row");
        Ok(summary)
    }

    /// Rebuild a summary row from the stored detail document alone
    pub async fn rebuild(&self, league: League, player_id: &str, season: i32, now: DateTime<Utc>) -> Result<PlayerSummary> {
        let detail = self
            .store
            .get_season_stats(league, player_id)
            .await?
            .ok_or_else(|| PipelineError::Store(format!("no detail document for {league} player {player_id}")))?;
        self.link(&detail, season, now).await
    }

    /// Summary-only leagues project straight from the resolved record
    pub async fn link_record(&self, league: League, resolved: &ResolvedPlayer, now: DateTime<Utc>) -> Result<PlayerSummary> {
        let stats = match &resolved.record.stats {
            CategoryStats::NflTotals(totals) => SummaryStats::Nfl(project_nfl(totals)),
            CategoryStats::NbaTotals(totals) => SummaryStats::Nba(project_nba(totals)),
            CategoryStats::Soccer(stats) => SummaryStats::Soccer(project_soccer(stats)),
            CategoryStats::NbaAdvanced(_) => {
                return Err(PipelineError::merge(&resolved.player_id, "advanced metrics have no summary projection"));
            }
        };

        let record = &resolved.record;
        let mut summary = self
            .store
            .get_player(league, &resolved.player_id)
            .await?
            .unwrap_or_else(|| PlayerSummary::new(league, &resolved.player_id, &resolved.player_name, now));

        summary.name = resolved.player_name.clone();
        summary.team_id = resolved.team.clone();
        if record.position.is_some() {
            summary.position = record.position.clone();
        }
        if record.number.is_some() {
            summary.number = record.number;
        }
        if record.age.is_some() {
            summary.age = record.age;
        }
        summary.stats = Some(stats);
        summary.last_updated = now;

        self.store.upsert_player(&summary).await?;
        Ok(summary)
    }
}

fn missing_entry(detail: &PlayerSeasonStats, season: i32) -> PipelineError {
    PipelineError::merge(&detail.player_id, format!("no regular-phase entry for season {season}"))
}
