//! Statistics provider contract and its HTTP implementation

use crate::config::ProviderConfig;
use crate::error::{PipelineError, Result};
use crate::models::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Provider endpoints, one per statistics category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    NbaTotals,
    NbaAdvanced,
    NflTeamStats,
    EplPlayerStats,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::NbaTotals => "nba/player-totals",
            Endpoint::NbaAdvanced => "nba/player-advanced",
            Endpoint::NflTeamStats => "nfl/team-player-stats",
            Endpoint::EplPlayerStats => "epl/player-stats",
        }
    }

    pub fn league(&self) -> League {
        match self {
            Endpoint::NbaTotals | Endpoint::NbaAdvanced => League::Nba,
            Endpoint::NflTeamStats => League::Nfl,
            Endpoint::EplPlayerStats => League::Epl,
        }
    }

    pub fn category(&self) -> StatCategory {
        match self {
            Endpoint::NbaTotals | Endpoint::NflTeamStats => StatCategory::Totals,
            Endpoint::NbaAdvanced => StatCategory::Advanced,
            Endpoint::EplPlayerStats => StatCategory::Season,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Filter parameters for one provider request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub league: League,
    pub season: i32,
    pub phase: Phase,
    pub page: u32,
    /// Restricts the request to one team's roster
    pub team: Option<String>,
}

impl PageQuery {
    pub fn new(league: League, season: i32, phase: Phase) -> Self {
        Self { league, season, phase, page: 1, team: None }
    }

    pub fn for_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn at_page(&self, page: u32) -> Self {
        Self { page, ..self.clone() }
    }
}

/// One page of records plus the provider's page-count hint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<StatRecord>,
    pub total_pages: u32,
}

/// Abstract statistics provider
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Mandatory pause after fetching `page`, imposed by the provider's rate limits
    fn page_delay(&self, page: u32) -> Duration;

    /// Fetch one page of an endpoint
    async fn fetch_page(&self, endpoint: Endpoint, query: &PageQuery) -> Result<Page>;

    /// Fetch the league's teams with current standings
    async fn fetch_teams(&self, league: League, season: i32) -> Result<Vec<TeamStanding>>;
}

/// HTTP provider speaking the `{ data, meta }` JSON envelope
pub struct HttpStatsProvider {
    config: ProviderConfig,
    client: Client,
    api_key: String,
}

impl HttpStatsProvider {
    /// Create a new provider instance
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client, api_key })
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(url = %url, ?params, "Provider request");

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::ProviderStatus {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PipelineError::malformed(path, e.to_string()))
    }
}

#[async_trait]
impl StatsProvider for HttpStatsProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn page_delay(&self, page: u32) -> Duration {
        self.config.page_delay(page)
    }

    async fn fetch_page(&self, endpoint: Endpoint, query: &PageQuery) -> Result<Page> {
        let mut params = vec![
            ("season", query.season.to_string()),
            ("phase", query.phase.to_string()),
            ("page", query.page.to_string()),
        ];
        if let Some(team) = &query.team {
            params.push(("team", team.clone()));
        }

        let body = self.get_json(endpoint.path(), &params).await?;
        decode_page(endpoint, body, query.season)
    }

    async fn fetch_teams(&self, league: League, season: i32) -> Result<Vec<TeamStanding>> {
        let path = format!("{}/teams", league.as_str().to_lowercase());
        let body = self.get_json(&path, &[("season", season.to_string())]).await?;
        let (rows, _) = decode_envelope::<TeamRow>(&path, body)?;
        Ok(rows.into_iter().map(TeamRow::into_standing).collect())
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    total_pages: Option<u32>,
}

/// Split a response body into rows and a page count (at least 1)
fn decode_envelope<T: DeserializeOwned>(label: &str, body: serde_json::Value) -> Result<(Vec<T>, u32)> {
    if !body.get("data").map(|d| d.is_array()).unwrap_or(false) {
        return Err(PipelineError::malformed(label, "missing `data` array"));
    }

    let envelope: Envelope<T> =
        serde_json::from_value(body).map_err(|e| PipelineError::malformed(label, e.to_string()))?;
    let total_pages = envelope.meta.and_then(|m| m.total_pages).unwrap_or(1).max(1);
    Ok((envelope.data, total_pages))
}

/// Decode a page body for an endpoint into typed records
pub fn decode_page(endpoint: Endpoint, body: serde_json::Value, season: i32) -> Result<Page> {
    let label = endpoint.path();
    let (records, total_pages): (Vec<StatRecord>, u32) = match endpoint {
        Endpoint::NbaTotals => {
            let (rows, pages) = decode_envelope::<NbaTotalsRow>(label, body)?;
            (rows.into_iter().map(|r| r.into_record(season)).collect(), pages)
        }
        Endpoint::NbaAdvanced => {
            let (rows, pages) = decode_envelope::<NbaAdvancedRow>(label, body)?;
            (rows.into_iter().map(|r| r.into_record(season)).collect(), pages)
        }
        Endpoint::NflTeamStats => {
            let (rows, pages) = decode_envelope::<NflPlayerRow>(label, body)?;
            (rows.into_iter().map(|r| r.into_record(season)).collect(), pages)
        }
        Endpoint::EplPlayerStats => {
            let (rows, pages) = decode_envelope::<EplPlayerRow>(label, body)?;
            (rows.into_iter().map(|r| r.into_record(season)).collect(), pages)
        }
    };

    Ok(Page { records, total_pages })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NbaTotalsRow {
    id: i64,
    player_id: String,
    player_name: String,
    team: String,
    position: Option<String>,
    age: Option<u32>,
    games: u32,
    #[serde(default)]
    games_started: u32,
    #[serde(default)]
    minutes_pg: f64,
    #[serde(default)]
    field_goals: u32,
    #[serde(default)]
    field_attempts: u32,
    #[serde(default)]
    three_fg: u32,
    #[serde(default)]
    three_attempts: u32,
    #[serde(default)]
    ft: u32,
    #[serde(default)]
    ft_attempts: u32,
    #[serde(default)]
    offensive_rb: u32,
    #[serde(default)]
    defensive_rb: u32,
    #[serde(default)]
    total_rb: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    steals: u32,
    #[serde(default)]
    blocks: u32,
    #[serde(default)]
    turnovers: u32,
    #[serde(default)]
    personal_fouls: u32,
    points: u32,
}

impl NbaTotalsRow {
    fn into_record(self, season: i32) -> StatRecord {
        // Provider reports minutes per game on the totals endpoint
        let minutes = (self.minutes_pg * self.games as f64).round() as u32;
        StatRecord {
            record_id: self.id,
            player_id: self.player_id,
            player_name: self.player_name,
            team: self.team,
            position: self.position,
            age: self.age,
            number: None,
            season,
            games: self.games,
            stats: CategoryStats::NbaTotals(NbaTotals {
                games: self.games,
                games_started: self.games_started,
                minutes,
                field_goals: self.field_goals,
                field_goal_attempts: self.field_attempts,
                three_pointers: self.three_fg,
                three_point_attempts: self.three_attempts,
                free_throws: self.ft,
                free_throw_attempts: self.ft_attempts,
                offensive_rebounds: self.offensive_rb,
                defensive_rebounds: self.defensive_rb,
                total_rebounds: self.total_rb,
                assists: self.assists,
                steals: self.steals,
                blocks: self.blocks,
                turnovers: self.turnovers,
                personal_fouls: self.personal_fouls,
                points: self.points,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NbaAdvancedRow {
    id: i64,
    player_id: String,
    player_name: String,
    team: String,
    position: Option<String>,
    age: Option<u32>,
    games: u32,
    #[serde(default)]
    minutes_played: u32,
    per: Option<f64>,
    ts_percent: Option<f64>,
    usage_percent: Option<f64>,
    offensive_ws: Option<f64>,
    defensive_ws: Option<f64>,
    win_shares: Option<f64>,
    win_shares_per: Option<f64>,
    #[serde(rename = "box")]
    box_plus_minus: Option<f64>,
    vorp: Option<f64>,
}

impl NbaAdvancedRow {
    fn into_record(self, season: i32) -> StatRecord {
        StatRecord {
            record_id: self.id,
            player_id: self.player_id,
            player_name: self.player_name,
            team: self.team,
            position: self.position,
            age: self.age,
            number: None,
            season,
            games: self.games,
            stats: CategoryStats::NbaAdvanced(NbaAdvanced {
                games: self.games,
                minutes: self.minutes_played,
                player_efficiency_rating: self.per,
                true_shooting_pct: self.ts_percent,
                usage_pct: self.usage_percent,
                offensive_win_shares: self.offensive_ws,
                defensive_win_shares: self.defensive_ws,
                win_shares: self.win_shares,
                win_shares_per_48: self.win_shares_per,
                box_plus_minus: self.box_plus_minus,
                value_over_replacement: self.vorp,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NflPlayerRow {
    id: i64,
    player_id: String,
    name: String,
    #[serde(default)]
    team: String,
    position: Option<String>,
    number: Option<u32>,
    age: Option<u32>,
    #[serde(default)]
    games: u32,
    #[serde(default)]
    passing_yards: u32,
    #[serde(default)]
    passing_touchdowns: u32,
    #[serde(default)]
    interceptions: u32,
    #[serde(default)]
    rushing_yards: u32,
    #[serde(default)]
    rushing_touchdowns: u32,
    #[serde(default)]
    receptions: u32,
    #[serde(default)]
    receiving_yards: u32,
    #[serde(default)]
    receiving_touchdowns: u32,
    fantasy_points: Option<f64>,
}

impl NflPlayerRow {
    fn into_record(self, season: i32) -> StatRecord {
        StatRecord {
            record_id: self.id,
            player_id: self.player_id,
            player_name: self.name,
            team: self.team,
            position: self.position,
            age: self.age,
            number: self.number,
            season,
            games: self.games,
            stats: CategoryStats::NflTotals(NflTotals {
                games: self.games,
                passing_yards: self.passing_yards,
                passing_touchdowns: self.passing_touchdowns,
                interceptions: self.interceptions,
                rushing_yards: self.rushing_yards,
                rushing_touchdowns: self.rushing_touchdowns,
                receptions: self.receptions,
                receiving_yards: self.receiving_yards,
                receiving_touchdowns: self.receiving_touchdowns,
                fantasy_points: self.fantasy_points.unwrap_or(0.0),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EplPlayerRow {
    id: i64,
    player_id: String,
    name: String,
    team: String,
    position: Option<String>,
    age: Option<u32>,
    #[serde(default)]
    appearances: u32,
    #[serde(default)]
    lineups: u32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    goals: GoalStats,
    #[serde(default)]
    cards: CardStats,
    #[serde(default)]
    passes: PassStats,
    #[serde(default)]
    defense: DefensiveStats,
    rating: Option<f64>,
}

impl EplPlayerRow {
    fn into_record(self, season: i32) -> StatRecord {
        StatRecord {
            record_id: self.id,
            player_id: self.player_id,
            player_name: self.name,
            team: self.team,
            position: self.position,
            age: self.age,
            number: None,
            season,
            games: self.appearances,
            stats: CategoryStats::Soccer(SoccerSeasonStats {
                appearances: self.appearances,
                lineups: self.lineups,
                minutes: self.minutes,
                goals: self.goals,
                cards: self.cards,
                passes: self.passes,
                defense: self.defense,
                rating: self.rating,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamRow {
    id: String,
    name: String,
    display_name: Option<String>,
    logo: Option<String>,
    #[serde(default)]
    rank: u32,
    #[serde(default)]
    wins: u32,
    #[serde(default)]
    losses: u32,
    #[serde(default)]
    draws: u32,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    games_played: u32,
    win_percentage: Option<f64>,
}

impl TeamRow {
    fn into_standing(self) -> TeamStanding {
        let win_percentage = self.win_percentage.unwrap_or_else(|| {
            if self.games_played == 0 {
                0.0
            } else {
                self.wins as f64 / self.games_played as f64
            }
        });

        TeamStanding {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            team_id: self.id,
            name: self.name,
            logo: self.logo,
            standings: Standings {
                rank: self.rank,
                wins: self.wins,
                losses: self.losses,
                draws: self.draws,
                points: self.points,
                games_played: self.games_played,
                win_percentage,
            },
        }
    }
}
