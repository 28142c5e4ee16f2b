//! Scripted provider and record builders shared by the test modules

use crate::error::{PipelineError, Result};
use crate::models::*;
use crate::provider::{Endpoint, Page, PageQuery, StatsProvider};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

enum Scripted {
    Page(Page),
    Fail(u16),
}

/// Provider answering from a script; unscripted pages come back empty
#[derive(Default)]
pub struct MockProvider {
    pages: Mutex<HashMap<(Endpoint, PageQuery), Scripted>>,
    teams: Mutex<HashMap<League, std::result::Result<Vec<TeamStanding>, u16>>>,
    calls: Mutex<Vec<(Endpoint, PageQuery)>>,
    delays: Mutex<Vec<u32>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_page(&self, endpoint: Endpoint, query: &PageQuery, records: Vec<StatRecord>, total_pages: u32) {
        self.pages
            .lock()
            .unwrap()
            .insert((endpoint, query.clone()), Scripted::Page(Page { records, total_pages }));
    }

    pub fn fail_page(&self, endpoint: Endpoint, query: &PageQuery, status: u16) {
        self.pages.lock().unwrap().insert((endpoint, query.clone()), Scripted::Fail(status));
    }

    pub fn script_teams(&self, league: League, teams: Vec<TeamStanding>) {
        self.teams.lock().unwrap().insert(league, Ok(teams));
    }

    pub fn fail_teams(&self, league: League, status: u16) {
        self.teams.lock().unwrap().insert(league, Err(status));
    }

    /// Pages requested for an endpoint, in request order
    pub fn requested_pages(&self, endpoint: Endpoint) -> Vec<u32> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, q)| q.page)
            .collect()
    }

    pub fn calls(&self) -> Vec<(Endpoint, PageQuery)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delays_requested(&self) -> Vec<u32> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn page_delay(&self, page: u32) -> Duration {
        self.delays.lock().unwrap().push(page);
        Duration::ZERO
    }

    async fn fetch_page(&self, endpoint: Endpoint, query: &PageQuery) -> Result<Page> {
        self.calls.lock().unwrap().push((endpoint, query.clone()));
        match self.pages.lock().unwrap().get(&(endpoint, query.clone())) {
            Some(Scripted::Page(page)) => Ok(page.clone()),
            Some(Scripted::Fail(status)) => Err(PipelineError::ProviderStatus {
                endpoint: endpoint.path().to_string(),
                status: *status,
            }),
            None => Ok(Page { records: Vec::new(), total_pages: 1 }),
        }
    }

    async fn fetch_teams(&self, league: League, _season: i32) -> Result<Vec<TeamStanding>> {
        match self.teams.lock().unwrap().get(&league) {
            Some(Ok(teams)) => Ok(teams.clone()),
            Some(Err(status)) => Err(PipelineError::ProviderStatus {
                endpoint: format!("{}/teams", league.as_str().to_lowercase()),
                status: *status,
            }),
            None => Ok(Vec::new()),
        }
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 6, 0, 0).unwrap()
}

pub fn nba_totals(record_id: i64, player_id: &str, name: &str, team: &str, games: u32, points: u32) -> StatRecord {
    StatRecord {
        record_id,
        player_id: player_id.to_string(),
        player_name: name.to_string(),
        team: team.to_string(),
        position: Some("SF".to_string()),
        age: Some(27),
        number: None,
        season: 2025,
        games,
        stats: CategoryStats::NbaTotals(NbaTotals {
            games,
            minutes: games * 30,
            field_goals: points / 3,
            field_goal_attempts: points / 2,
            total_rebounds: games * 5,
            assists: games * 4,
            points,
            ..Default::default()
        }),
    }
}

pub fn nba_advanced(record_id: i64, player_id: &str, name: &str, team: &str, games: u32, per: f64) -> StatRecord {
    StatRecord {
        record_id,
        player_id: player_id.to_string(),
        player_name: name.to_string(),
        team: team.to_string(),
        position: Some("SF".to_string()),
        age: Some(27),
        number: None,
        season: 2025,
        games,
        stats: CategoryStats::NbaAdvanced(NbaAdvanced {
            games,
            minutes: games * 30,
            player_efficiency_rating: Some(per),
            win_shares: Some(per / 4.0),
            ..Default::default()
        }),
    }
}

pub fn nfl_record(record_id: i64, player_id: &str, name: &str, team: &str, games: u32, passing_yards: u32) -> StatRecord {
    StatRecord {
        record_id,
        player_id: player_id.to_string(),
        player_name: name.to_string(),
        team: team.to_string(),
        position: Some("QB".to_string()),
        age: Some(28),
        number: Some(17),
        season: 2025,
        games,
        stats: CategoryStats::NflTotals(NflTotals {
            games,
            passing_yards,
            passing_touchdowns: 10,
            rushing_touchdowns: 2,
            fantasy_points: 120.0,
            ..Default::default()
        }),
    }
}

pub fn soccer_record(record_id: i64, player_id: &str, name: &str, team: &str, appearances: u32, goals: u32) -> StatRecord {
    StatRecord {
        record_id,
        player_id: player_id.to_string(),
        player_name: name.to_string(),
        team: team.to_string(),
        position: Some("Attacker".to_string()),
        age: Some(25),
        number: None,
        season: 2025,
        games: appearances,
        stats: CategoryStats::Soccer(SoccerSeasonStats {
            appearances,
            minutes: appearances * 80,
            goals: GoalStats { total: goals, assists: 3, conceded: 0 },
            cards: CardStats { yellow: 2, red: 0 },
            ..Default::default()
        }),
    }
}

pub fn team_standing(id: &str, name: &str, rank: u32) -> TeamStanding {
    TeamStanding {
        team_id: id.to_string(),
        name: name.to_string(),
        display_name: name.to_string(),
        logo: None,
        standings: Standings { rank, wins: 5, losses: 3, games_played: 8, win_percentage: 0.625, ..Default::default() },
    }
}
