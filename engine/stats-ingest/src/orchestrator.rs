//! Update orchestrator
//!
//! Runs the enabled leagues one after another in a fixed order. Each league
//! run gets its own [`RunConfig`], so a season or phase chosen for one run
//! never leaks into another. A league that fails is recorded as failed and the
//! cycle moves on to the next league.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::fetcher::{FetchedPages, PaginatedFetcher};
use crate::ledger::UpdateLedger;
use crate::linker::SummaryLinker;
use crate::merger::SeasonMerger;
use crate::models::*;
use crate::provider::{Endpoint, PageQuery, StatsProvider};
use crate::resolver::resolve_players;
use crate::store::StatsStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Which leagues a cycle should attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeagueSelection {
    pub nba: bool,
    pub nfl: bool,
    pub epl: bool,
}

impl LeagueSelection {
    pub fn all() -> Self {
        Self { nba: true, nfl: true, epl: true }
    }

    pub fn only(league: League) -> Self {
        Self { nba: league == League::Nba, nfl: league == League::Nfl, epl: league == League::Epl }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            nba: config.leagues.nba.enabled,
            nfl: config.leagues.nfl.enabled,
            epl: config.leagues.epl.enabled,
        }
    }

    pub fn includes(&self, league: League) -> bool {
        match league {
            League::Nba => self.nba,
            League::Nfl => self.nfl,
            League::Epl => self.epl,
        }
    }
}

/// Parameters accepted from the external trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub leagues: LeagueSelection,
    /// Applies to leagues with phase selection
    pub phase: Option<Phase>,
    pub nba_season: Option<i32>,
    pub epl_season: Option<i32>,
}

impl TriggerRequest {
    pub fn new(leagues: LeagueSelection) -> Self {
        Self { leagues, phase: None, nba_season: None, epl_season: None }
    }

    fn season_override(&self, league: League) -> Option<i32> {
        match league {
            League::Nba => self.nba_season,
            League::Epl => self.epl_season,
            League::Nfl => None,
        }
    }
}

/// Settings for one league run, passed explicitly down every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub league: League,
    pub season: i32,
    pub phase: Phase,
    pub current_season: i32,
    pub preserve_on_failure: bool,
    /// Timestamp written into every entry touched by this run
    pub started_at: DateTime<Utc>,
}

impl RunConfig {
    /// Build the run settings for `league` from defaults and request overrides
    pub fn for_league(config: &PipelineConfig, league: League, request: &TriggerRequest, started_at: DateTime<Utc>) -> Self {
        let settings = config.leagues.get(league);

        let season = if league.supports_season_selection() {
            request.season_override(league).unwrap_or(settings.current_season)
        } else {
            settings.current_season
        };

        let phase = if league.supports_phase_selection() {
            request.phase.unwrap_or(settings.default_phase)
        } else {
            Phase::Regular
        };

        Self {
            league,
            season,
            phase,
            current_season: settings.current_season,
            preserve_on_failure: config.merge.preserve_on_failure,
            started_at,
        }
    }

    pub fn is_current_season(&self) -> bool {
        self.season == self.current_season
    }

    fn query(&self) -> PageQuery {
        PageQuery::new(self.league, self.season, self.phase)
    }
}

/// Counters for one league run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueRunStats {
    pub teams_updated: usize,
    pub records_fetched: usize,
    pub players_merged: usize,
    pub players_linked: usize,
    pub players_skipped: usize,
    pub partial_fetches: usize,
    /// Fetch units (category or team) that failed outright
    pub failed_fetches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueOutcome {
    pub league: League,
    pub season: i32,
    pub phase: Phase,
    pub success: bool,
    pub duration: Duration,
    pub stats: LeagueRunStats,
    pub error: Option<String>,
}

impl LeagueOutcome {
    pub fn finished(league: League, season: i32, phase: Phase, success: bool, duration: Duration) -> Self {
        Self { league, season, phase, success, duration, stats: LeagueRunStats::default(), error: None }
    }
}

/// Result handed back to the trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerReport {
    pub outcomes: Vec<LeagueOutcome>,
    pub duration: Duration,
    /// Human-readable completion time
    pub completed_at: String,
    pub ledger_written: bool,
}

impl TriggerReport {
    pub fn outcome(&self, league: League) -> Option<&LeagueOutcome> {
        self.outcomes.iter().find(|o| o.league == league)
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| !o.success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running(League),
}

/// Sequences fetch, resolve, merge and link for every enabled league
pub struct UpdateOrchestrator {
    config: PipelineConfig,
    provider: Arc<dyn StatsProvider>,
    store: Arc<dyn StatsStore>,
    fetcher: PaginatedFetcher,
    merger: SeasonMerger,
    linker: SummaryLinker,
    ledger: UpdateLedger,
    state: watch::Sender<OrchestratorState>,
}

impl UpdateOrchestrator {
    pub fn new(config: PipelineConfig, provider: Arc<dyn StatsProvider>, store: Arc<dyn StatsStore>) -> Self {
        let (state, _) = watch::channel(OrchestratorState::Idle);
        Self {
            config,
            fetcher: PaginatedFetcher::new(provider.clone()),
            merger: SeasonMerger::new(store.clone()),
            linker: SummaryLinker::new(store.clone()),
            ledger: UpdateLedger::new(store.clone()),
            provider,
            store,
            state,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    /// Run one full update cycle and record it in the ledger
    pub async fn trigger(&self, request: TriggerRequest) -> TriggerReport {
        let cycle_start = Instant::now();
        info!(?request, "Starting update cycle");

        let mut outcomes = Vec::new();
        for league in League::ORDER {
            if !request.leagues.includes(league) {
                continue;
            }

            let run = RunConfig::for_league(&self.config, league, &request, Utc::now());
            self.state.send_replace(OrchestratorState::Running(league));
            outcomes.push(self.run_wrapped(&run).await);
        }
        self.state.send_replace(OrchestratorState::Idle);

        let finished_at = Utc::now();
        let mut report = TriggerReport {
            outcomes,
            duration: cycle_start.elapsed(),
            completed_at: finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ledger_written: false,
        };

        match self.ledger.record_cycle(&report, finished_at).await {
            Ok(()) => report.ledger_written = true,
            Err(e) => error!(error = %e, "Failed to write update ledger"),
        }

        info!(
            duration_ms = report.duration.as_millis() as u64,
            succeeded = report.outcomes.iter().filter(|o| o.success).count(),
            failed = report.outcomes.iter().filter(|o| !o.success).count(),
            "Update cycle completed at {}",
            report.completed_at
        );

        report
    }

    async fn run_wrapped(&self, run: &RunConfig) -> LeagueOutcome {
        let started = Instant::now();
        info!(league = %run.league, season = run.season, phase = %run.phase, "League update started");

        let result = self.run_league(run).await;
        let duration = started.elapsed();

        match result {
            Ok(stats) => {
                let success = stats.failed_fetches.is_empty();
                if success {
                    info!(league = %run.league, duration_ms = duration.as_millis() as u64, ?stats, "League update succeeded");
                } else {
                    warn!(
                        league = %run.league,
                        failed = ?stats.failed_fetches,
                        "League update finished with failed fetches, stored data for them left untouched"
                    );
                }
                LeagueOutcome {
                    league: run.league,
                    season: run.season,
                    phase: run.phase,
                    success,
                    duration,
                    stats,
                    error: None,
                }
            }
            Err(e) => {
                error!(league = %run.league, season = run.season, error = %e, "League update failed");
                LeagueOutcome {
                    error: Some(e.to_string()),
                    ..LeagueOutcome::finished(run.league, run.season, run.phase, false, duration)
                }
            }
        }
    }

    /// Run one league: teams first, then the league's player pipeline
    pub async fn run_league(&self, run: &RunConfig) -> Result<LeagueRunStats> {
        let mut stats = LeagueRunStats::default();

        let teams = match self.refresh_teams(run, &mut stats).await {
            Ok(teams) => teams,
            // NFL needs the team list to know what to fetch
            Err(e) if run.league == League::Nfl => return Err(e),
            Err(e) => {
                warn!(league = %run.league, error = %e, "Standings refresh failed, continuing with player stats");
                Vec::new()
            }
        };

        match run.league {
            League::Nba => self.run_nba(run, &mut stats).await?,
            League::Nfl => self.run_nfl(run, &teams, &mut stats).await?,
            League::Epl => self.run_epl(run, &mut stats).await?,
        }

        Ok(stats)
    }

    async fn refresh_teams(&self, run: &RunConfig, stats: &mut LeagueRunStats) -> Result<Vec<TeamStanding>> {
        let standings = self.provider.fetch_teams(run.league, run.season).await?;

        for standing in &standings {
            let team = Team::from_standing(run.league, standing.clone(), run.started_at);
            match self.store.upsert_team(&team).await {
                Ok(()) => stats.teams_updated += 1,
                Err(e) => warn!(league = %run.league, team = %team.id, error = %e, "Failed to store team"),
            }
        }

        Ok(standings)
    }

    async fn run_nba(&self, run: &RunConfig, stats: &mut LeagueRunStats) -> Result<()> {
        // every fetch for the league completes before any merge starts
        let mut fetched = Vec::new();
        for endpoint in [Endpoint::NbaTotals, Endpoint::NbaAdvanced] {
            fetched.push((endpoint, self.fetcher.fetch_all(endpoint, &run.query()).await));
        }
        let fetched = self.settle_fetches(run, fetched, stats)?;

        let link_after_totals = run.phase == Phase::Regular && run.is_current_season();
        for (endpoint, pages) in fetched {
            let link = link_after_totals && endpoint.category() == StatCategory::Totals;
            self.merge_category(run, endpoint, pages, link, stats).await;
        }
        Ok(())
    }

    async fn run_epl(&self, run: &RunConfig, stats: &mut LeagueRunStats) -> Result<()> {
        let endpoint = Endpoint::EplPlayerStats;
        let result = self.fetcher.fetch_all(endpoint, &run.query()).await;
        let fetched = self.settle_fetches(run, vec![(endpoint, result)], stats)?;

        for (endpoint, pages) in fetched {
            self.merge_category(run, endpoint, pages, run.is_current_season(), stats).await;
        }
        Ok(())
    }

    /// Fetch every team's roster stats, resolve trades across the whole
    /// league, then upsert summary rows player by player.
    async fn run_nfl(&self, run: &RunConfig, teams: &[TeamStanding], stats: &mut LeagueRunStats) -> Result<()> {
        if teams.is_empty() {
            return Err(PipelineError::malformed(format!("{}/teams", run.league), "no teams returned"));
        }

        let endpoint = Endpoint::NflTeamStats;
        let mut records = Vec::new();
        let mut last_error = None;
        for team in teams {
            let query = run.query().for_team(&team.team_id);
            match self.fetcher.fetch_all(endpoint, &query).await {
                Ok(pages) => {
                    if pages.is_partial() {
                        stats.partial_fetches += 1;
                    }
                    records.extend(pages.records);
                }
                Err(e) => {
                    warn!(league = %run.league, team = %team.team_id, error = %e, "Team stats fetch failed");
                    stats.failed_fetches.push(format!("team:{}", team.team_id));
                    last_error = Some(e);
                }
            }
        }

        if stats.failed_fetches.len() == teams.len() {
            return Err(last_error.unwrap_or_else(|| PipelineError::Internal("every team fetch failed".to_string())));
        }
        if !stats.failed_fetches.is_empty() && !run.preserve_on_failure {
            return Err(PipelineError::Internal(format!(
                "aborting {} before writing: {} team fetches failed",
                run.league,
                stats.failed_fetches.len()
            )));
        }

        stats.records_fetched += records.len();
        for player in resolve_players(records) {
            match self.linker.link_record(run.league, &player, run.started_at).await {
                Ok(_) => stats.players_linked += 1,
                Err(e) => {
                    warn!(league = %run.league, player_id = %player.player_id, error = %e, "Failed to update summary row");
                    stats.players_skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Split fetch results into usable pages and failures. With
    /// preserve-on-failure off, any failure aborts the league before merging.
    fn settle_fetches(
        &self,
        run: &RunConfig,
        results: Vec<(Endpoint, Result<FetchedPages>)>,
        stats: &mut LeagueRunStats,
    ) -> Result<Vec<(Endpoint, FetchedPages)>> {
        let mut usable = Vec::new();
        let mut first_error = None;

        for (endpoint, result) in results {
            match result {
                Ok(pages) => {
                    if pages.is_partial() {
                        stats.partial_fetches += 1;
                    }
                    stats.records_fetched += pages.records.len();
                    usable.push((endpoint, pages));
                }
                Err(e) => {
                    warn!(league = %run.league, endpoint = %endpoint, error = %e, "Category fetch failed, keeping stored values");
                    stats.failed_fetches.push(endpoint.category().to_string());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if !run.preserve_on_failure => Err(e),
            Some(e) if usable.is_empty() => Err(e),
            _ => Ok(usable),
        }
    }

    async fn merge_category(&self, run: &RunConfig, endpoint: Endpoint, pages: FetchedPages, link: bool, stats: &mut LeagueRunStats) {
        for player in resolve_players(pages.records) {
            let outcome = match self.merger.merge(run.league, &player, run.phase, run.started_at).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        league = %run.league,
                        endpoint = %endpoint,
                        player_id = %player.player_id,
                        player = %player.player_name,
                        error = %e,
                        "Skipping player merge"
                    );
                    stats.players_skipped += 1;
                    continue;
                }
            };
            stats.players_merged += 1;

            if link {
                match self.linker.link(&outcome.document, run.season, run.started_at).await {
                    Ok(_) => stats.players_linked += 1,
                    Err(e) => warn!(league = %run.league, player_id = %player.player_id, error = %e, "Failed to link summary row"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixed_time;

    #[test]
    fn test_run_config_applies_overrides_per_league() {
        let config = PipelineConfig::default();
        let request = TriggerRequest {
            leagues: LeagueSelection::all(),
            phase: Some(Phase::Playoffs),
            nba_season: Some(2022),
            epl_season: Some(2021),
        };

        let nba = RunConfig::for_league(&config, League::Nba, &request, fixed_time());
        assert_eq!((nba.season, nba.phase), (2022, Phase::Playoffs));
        assert!(!nba.is_current_season());

        let nfl = RunConfig::for_league(&config, League::Nfl, &request, fixed_time());
        assert_eq!((nfl.season, nfl.phase), (2025, Phase::Regular));

        let epl = RunConfig::for_league(&config, League::Epl, &request, fixed_time());
        assert_eq!((epl.season, epl.phase), (2021, Phase::Regular));
    }

    #[test]
    fn test_run_config_defaults_without_overrides() {
        let config = PipelineConfig::default();
        let request = TriggerRequest::new(LeagueSelection::only(League::Nba));
        let run = RunConfig::for_league(&config, League::Nba, &request, fixed_time());

        assert_eq!(run.season, config.leagues.nba.current_season);
        assert_eq!(run.phase, Phase::Regular);
        assert!(run.is_current_season());
        assert!(run.preserve_on_failure);
    }

    #[test]
    fn test_selection() {
        let only = LeagueSelection::only(League::Epl);
        assert!(only.includes(League::Epl));
        assert!(!only.includes(League::Nba));
        assert!(!only.includes(League::Nfl));
    }
}
