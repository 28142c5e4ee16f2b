use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Leagues handled by the pipeline, in the order the orchestrator runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    Nba,
    Nfl,
    Epl,
}

impl League {
    /// Fixed run order
    pub const ORDER: [League; 3] = [League::Nba, League::Nfl, League::Epl];

    pub fn as_str(&self) -> &'static str {
        match self {
            League::Nba => "NBA",
            League::Nfl => "NFL",
            League::Epl => "EPL",
        }
    }

    pub fn sport(&self) -> Sport {
        match self {
            League::Nba => Sport::Basketball,
            League::Nfl => Sport::Football,
            League::Epl => Sport::Soccer,
        }
    }

    /// Whether a run may target a season other than the current one
    pub fn supports_season_selection(&self) -> bool {
        matches!(self, League::Nba | League::Epl)
    }

    /// Whether a run may target the postseason
    pub fn supports_phase_selection(&self) -> bool {
        matches!(self, League::Nba)
    }

    /// Whether the league keeps a per-season detail document
    pub fn keeps_season_history(&self) -> bool {
        matches!(self, League::Nba | League::Epl)
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Basketball,
    Football,
    Soccer,
}

/// Statistical context within a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Regular,
    Playoffs,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Regular => "regular",
            Phase::Playoffs => "playoffs",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-defined group of fields fetched by its own call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatCategory {
    Totals,
    Advanced,
    Season,
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatCategory::Totals => "totals",
            StatCategory::Advanced => "advanced",
            StatCategory::Season => "season",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Provider records
// ---------------------------------------------------------------------------

/// One per-team-per-player statistics row as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    /// Provider-internal row id, assigned in increasing order
    pub record_id: i64,
    pub player_id: String,
    pub player_name: String,
    /// Team label, or an aggregate marker such as "2TM"
    pub team: String,
    pub position: Option<String>,
    pub age: Option<u32>,
    pub number: Option<u32>,
    pub season: i32,
    pub games: u32,
    pub stats: CategoryStats,
}

/// Category-specific numbers carried by a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryStats {
    NbaTotals(NbaTotals),
    NbaAdvanced(NbaAdvanced),
    NflTotals(NflTotals),
    Soccer(SoccerSeasonStats),
}

impl CategoryStats {
    pub fn category(&self) -> StatCategory {
        match self {
            CategoryStats::NbaTotals(_) | CategoryStats::NflTotals(_) => StatCategory::Totals,
            CategoryStats::NbaAdvanced(_) => StatCategory::Advanced,
            CategoryStats::Soccer(_) => StatCategory::Season,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NbaTotals {
    pub games: u32,
    pub games_started: u32,
    pub minutes: u32,
    pub field_goals: u32,
    pub field_goal_attempts: u32,
    pub three_pointers: u32,
    pub three_point_attempts: u32,
    pub free_throws: u32,
    pub free_throw_attempts: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub total_rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub personal_fouls: u32,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NbaAdvanced {
    pub games: u32,
    pub minutes: u32,
    pub player_efficiency_rating: Option<f64>,
    pub true_shooting_pct: Option<f64>,
    pub usage_pct: Option<f64>,
    pub offensive_win_shares: Option<f64>,
    pub defensive_win_shares: Option<f64>,
    pub win_shares: Option<f64>,
    pub win_shares_per_48: Option<f64>,
    pub box_plus_minus: Option<f64>,
    pub value_over_replacement: Option<f64>,
}

impl NbaAdvanced {
    /// True when the provider sent the row but none of the metrics
    pub fn is_empty(&self) -> bool {
        [
            self.player_efficiency_rating,
            self.true_shooting_pct,
            self.usage_pct,
            self.offensive_win_shares,
            self.defensive_win_shares,
            self.win_shares,
            self.win_shares_per_48,
            self.box_plus_minus,
            self.value_over_replacement,
        ]
        .iter()
        .all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NflTotals {
    pub games: u32,
    pub passing_yards: u32,
    pub passing_touchdowns: u32,
    pub interceptions: u32,
    pub rushing_yards: u32,
    pub rushing_touchdowns: u32,
    pub receptions: u32,
    pub receiving_yards: u32,
    pub receiving_touchdowns: u32,
    pub fantasy_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoccerSeasonStats {
    pub appearances: u32,
    pub lineups: u32,
    pub minutes: u32,
    pub goals: GoalStats,
    pub cards: CardStats,
    pub passes: PassStats,
    pub defense: DefensiveStats,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalStats {
    pub total: u32,
    pub assists: u32,
    pub conceded: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardStats {
    pub yellow: u32,
    pub red: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassStats {
    pub total: u32,
    pub key: u32,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefensiveStats {
    pub tackles: u32,
    pub interceptions: u32,
    pub blocks: u32,
}

/// Team row with standings as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: String,
    pub name: String,
    pub display_name: String,
    pub logo: Option<String>,
    pub standings: Standings,
}

// ---------------------------------------------------------------------------
// Stored shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    pub rank: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u32,
    pub games_played: u32,
    pub win_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub league: League,
    pub name: String,
    pub display_name: String,
    pub logo: Option<String>,
    pub standings: Standings,
    pub last_updated: DateTime<Utc>,
}

impl Team {
    pub fn from_standing(league: League, standing: TeamStanding, now: DateTime<Utc>) -> Self {
        Self {
            id: standing.team_id,
            league,
            name: standing.name,
            display_name: standing.display_name,
            logo: standing.logo,
            standings: standing.standings,
            last_updated: now,
        }
    }
}

/// Denormalized per-player row for fast summary reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: String,
    pub league: League,
    pub team_id: String,
    pub name: String,
    pub position: Option<String>,
    pub number: Option<u32>,
    pub age: Option<u32>,
    /// Key of the detail document, see [`PlayerSeasonStats::key`]
    pub detail_ref: Option<String>,
    pub stats: Option<SummaryStats>,
    pub last_updated: DateTime<Utc>,
}

impl PlayerSummary {
    pub fn new(league: League, id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            league,
            team_id: String::new(),
            name: name.into(),
            position: None,
            number: None,
            age: None,
            detail_ref: None,
            stats: None,
            last_updated: now,
        }
    }
}

/// Display-ready current-season figures, one shape per sport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sport", rename_all = "lowercase")]
pub enum SummaryStats {
    Nba(NbaSummaryStats),
    Nfl(NflSummaryStats),
    Soccer(SoccerSummaryStats),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NbaSummaryStats {
    pub games_played: u32,
    pub minutes_per_game: f64,
    pub points_per_game: f64,
    pub rebounds_per_game: f64,
    pub assists_per_game: f64,
    pub steals_per_game: f64,
    pub blocks_per_game: f64,
    pub turnovers_per_game: f64,
    pub field_goal_pct: f64,
    pub three_point_pct: f64,
    pub free_throw_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NflSummaryStats {
    pub games_played: u32,
    pub passing_yards_per_game: f64,
    pub rushing_yards_per_game: f64,
    pub receiving_yards_per_game: f64,
    pub receptions_per_game: f64,
    pub total_touchdowns: u32,
    pub fantasy_points_per_game: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoccerSummaryStats {
    pub games_played: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub goals_per_game: f64,
    pub assists_per_game: f64,
    pub minutes_per_game: f64,
}

/// Per-player detail document holding season history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonStats {
    pub league: League,
    pub player_id: String,
    pub name: String,
    pub history: SeasonHistory,
}

impl PlayerSeasonStats {
    /// Empty document for a league that keeps season history
    pub fn new(league: League, player_id: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let history = SeasonHistory::empty_for(league)?;
        Some(Self { league, player_id: player_id.into(), name: name.into(), history })
    }

    /// Stable reference stored on the summary row
    pub fn key(&self) -> String {
        detail_key(self.league, &self.player_id)
    }

    pub fn nba_entry(&self, season: i32, phase: Phase) -> Option<&NbaSeasonEntry> {
        match &self.history {
            SeasonHistory::Nba { regular_seasons, playoffs } => match phase {
                Phase::Regular => regular_seasons.get(&season),
                Phase::Playoffs => playoffs.get(&season),
            },
            SeasonHistory::Soccer { .. } => None,
        }
    }

    pub fn soccer_entry(&self, season: i32) -> Option<&SoccerSeasonEntry> {
        match &self.history {
            SeasonHistory::Soccer { seasons } => seasons.get(&season),
            SeasonHistory::Nba { .. } => None,
        }
    }

    /// Number of `(season, phase)` entries held
    pub fn entry_count(&self) -> usize {
        match &self.history {
            SeasonHistory::Nba { regular_seasons, playoffs } => {
                regular_seasons.len() + playoffs.len()
            }
            SeasonHistory::Soccer { seasons } => seasons.len(),
        }
    }
}

pub fn detail_key(league: League, player_id: &str) -> String {
    format!("{}:{}", league.as_str(), player_id)
}

/// Season entries indexed by `(season, phase)`: the phase picks the map,
/// the season year is the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum SeasonHistory {
    Nba {
        regular_seasons: BTreeMap<i32, NbaSeasonEntry>,
        playoffs: BTreeMap<i32, NbaSeasonEntry>,
    },
    Soccer {
        seasons: BTreeMap<i32, SoccerSeasonEntry>,
    },
}

impl SeasonHistory {
    pub fn empty_for(league: League) -> Option<Self> {
        match league {
            League::Nba => Some(SeasonHistory::Nba {
                regular_seasons: BTreeMap::new(),
                playoffs: BTreeMap::new(),
            }),
            League::Epl => Some(SeasonHistory::Soccer { seasons: BTreeMap::new() }),
            League::Nfl => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NbaSeasonEntry {
    pub season: i32,
    pub team: String,
    pub position: Option<String>,
    pub age: Option<u32>,
    pub totals: Option<NbaTotals>,
    pub advanced: Option<NbaAdvanced>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoccerSeasonEntry {
    pub season: i32,
    pub team: String,
    pub position: Option<String>,
    pub age: Option<u32>,
    pub stats: Option<SoccerSeasonStats>,
    pub last_updated: DateTime<Utc>,
}

/// Generic key/value row of the update ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
