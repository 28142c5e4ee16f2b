//! Stats Ingest
//!
//! Pulls paginated player statistics for NBA, NFL and EPL from an external
//! provider, resolves traded players, merges each category into season-scoped
//! detail documents and keeps a flat summary row per player in sync.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod linker;
pub mod logging;
pub mod merger;
pub mod models;
pub mod orchestrator;
pub mod pg_store;
pub mod provider;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use models::*;
pub use orchestrator::{LeagueSelection, OrchestratorState, TriggerReport, TriggerRequest, UpdateOrchestrator};
pub use pg_store::PgStore;
pub use provider::{HttpStatsProvider, StatsProvider};
pub use store::{InMemoryStore, StatsStore};
