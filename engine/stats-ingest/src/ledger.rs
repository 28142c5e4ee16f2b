//! Update ledger written at the end of every orchestrator cycle

use crate::error::Result;
use crate::models::{League, Phase};
use crate::orchestrator::TriggerReport;
use crate::store::StatsStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Key of the global last-update entry
pub const GLOBAL_UPDATE_KEY: &str = "lastUpdate";

pub fn league_key(league: League) -> String {
    format!("{GLOBAL_UPDATE_KEY}_{}", league.as_str())
}

pub fn league_season_key(league: League, season: i32) -> String {
    format!("{GLOBAL_UPDATE_KEY}_{}_{}", league.as_str(), season)
}

/// Value stored under the league and league+season keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub season: i32,
    pub phase: Phase,
}

/// Value stored under [`GLOBAL_UPDATE_KEY`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalEntry {
    pub timestamp: DateTime<Utc>,
    pub completed_at: String,
    pub duration_ms: u64,
    pub leagues: Vec<League>,
}

pub struct UpdateLedger {
    store: Arc<dyn StatsStore>,
}

impl UpdateLedger {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Write the global entry plus one league and one league+season entry per
    /// league that ran.
    pub async fn record_cycle(&self, report: &TriggerReport, at: DateTime<Utc>) -> Result<()> {
        for outcome in &report.outcomes {
            let entry = LedgerEntry {
                success: outcome.success,
                timestamp: at,
                duration_ms: outcome.duration.as_millis() as u64,
                season: outcome.season,
                phase: outcome.phase,
            };
            let value = serde_json::to_value(&entry)?;

            self.store.put_system_info(&league_key(outcome.league), value.clone(), at).await?;
            self.store
                .put_system_info(&league_season_key(outcome.league, outcome.season), value, at)
                .await?;
        }

        let global = GlobalEntry {
            timestamp: at,
            completed_at: report.completed_at.clone(),
            duration_ms: report.duration.as_millis() as u64,
            leagues: report.outcomes.iter().map(|o| o.league).collect(),
        };
        self.store.put_system_info(GLOBAL_UPDATE_KEY, serde_json::to_value(&global)?, at).await?;

        info!(leagues = report.outcomes.len(), "Update ledger written");
        Ok(())
    }

    pub async fn league_entry(&self, league: League) -> Result<Option<LedgerEntry>> {
        self.read(&league_key(league)).await
    }

    pub async fn league_season_entry(&self, league: League, season: i32) -> Result<Option<LedgerEntry>> {
        self.read(&league_season_key(league, season)).await
    }

    pub async fn global_entry(&self) -> Result<Option<GlobalEntry>> {
        self.read(GLOBAL_UPDATE_KEY).await
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get_system_info(key).await? {
            Some(info) => Ok(Some(serde_json::from_value(info.value)?)),
            None => Ok(None),
        }
    }
}
