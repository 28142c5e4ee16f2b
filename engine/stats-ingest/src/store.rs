//! Persistent store abstraction and the in-memory backend

use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Abstract trait for the document store the pipeline writes into.
///
/// Every write is a single-document upsert; there are no cross-document
/// transactions.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn upsert_team(&self, team: &Team) -> Result<()>;

    async fn get_team(&self, league: League, team_id: &str) -> Result<Option<Team>>;

    async fn get_player(&self, league: League, player_id: &str) -> Result<Option<PlayerSummary>>;

    async fn upsert_player(&self, player: &PlayerSummary) -> Result<()>;

    async fn get_season_stats(&self, league: League, player_id: &str) -> Result<Option<PlayerSeasonStats>>;

    async fn save_season_stats(&self, stats: &PlayerSeasonStats) -> Result<()>;

    async fn put_system_info(&self, key: &str, value: serde_json::Value, at: DateTime<Utc>) -> Result<()>;

    async fn get_system_info(&self, key: &str) -> Result<Option<SystemInfo>>;
}

type Key = (League, String);

/// In-memory store (for testing and dry runs)
#[derive(Default, Clone)]
pub struct InMemoryStore {
    teams: Arc<Mutex<HashMap<Key, Team>>>,
    players: Arc<Mutex<HashMap<Key, PlayerSummary>>>,
    season_stats: Arc<Mutex<HashMap<Key, PlayerSeasonStats>>>,
    system_info: Arc<Mutex<HashMap<String, SystemInfo>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn team_count(&self, league: League) -> usize {
        self.teams.lock().await.keys().filter(|(l, _)| *l == league).count()
    }

    pub async fn players(&self, league: League) -> Vec<PlayerSummary> {
        let mut players: Vec<PlayerSummary> =
            self.players.lock().await.values().filter(|p| p.league == league).cloned().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    pub async fn season_stats_count(&self, league: League) -> usize {
        self.season_stats.lock().await.keys().filter(|(l, _)| *l == league).count()
    }

    pub async fn system_info_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.system_info.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn upsert_team(&self, team: &Team) -> Result<()> {
        self.teams.lock().await.insert((team.league, team.id.clone()), team.clone());
        Ok(())
    }

    async fn get_team(&self, league: League, team_id: &str) -> Result<Option<Team>> {
        Ok(self.teams.lock().await.get(&(league, team_id.to_string())).cloned())
    }

    async fn get_player(&self, league: League, player_id: &str) -> Result<Option<PlayerSummary>> {
        Ok(self.players.lock().await.get(&(league, player_id.to_string())).cloned())
    }

    async fn upsert_player(&self, player: &PlayerSummary) -> Result<()> {
        self.players.lock().await.insert((player.league, player.id.clone()), player.clone());
        Ok(())
    }

    async fn get_season_stats(&self, league: League, player_id: &str) -> Result<Option<PlayerSeasonStats>> {
        Ok(self.season_stats.lock().await.get(&(league, player_id.to_string())).cloned())
    }

    async fn save_season_stats(&self, stats: &PlayerSeasonStats) -> Result<()> {
        self.season_stats
            .lock()
            .await
            .insert((stats.league, stats.player_id.clone()), stats.clone());
        Ok(())
    }

    async fn put_system_info(&self, key: &str, value: serde_json::Value, at: DateTime<Utc>) -> Result<()> {
        let info = SystemInfo { key: key.to_string(), value, updated_at: at };
        self.system_info.lock().await.insert(key.to_string(), info);
        Ok(())
    }

    async fn get_system_info(&self, key: &str) -> Result<Option<SystemInfo>> {
        Ok(self.system_info.lock().await.get(key).cloned())
    }
}
