use stats_ingest::logging::initialize_logging;
use stats_ingest::{HttpStatsProvider, LeagueSelection, PgStore, PipelineConfig, TriggerRequest, UpdateOrchestrator};
use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = PipelineConfig::load().context("Failed to load pipeline configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting stats ingest");
    info!(provider = %config.provider.base_url, "Loaded configuration");

    let store = PgStore::connect(&config.database)
        .await
        .context("Failed to connect to stats database")?;
    let provider = HttpStatsProvider::new(config.provider.clone()).context("Failed to build stats provider")?;

    let request = TriggerRequest::new(LeagueSelection::from_config(&config));
    let orchestrator = UpdateOrchestrator::new(config, Arc::new(provider), Arc::new(store));
    let report = orchestrator.trigger(request).await;

    for outcome in &report.outcomes {
        info!(
            league = %outcome.league,
            season = outcome.season,
            phase = %outcome.phase,
            success = outcome.success,
            duration_ms = outcome.duration.as_millis() as u64,
            "League result"
        );
    }

    if report.all_failed() {
        error!("Every league failed, see errors above");
        std::process::exit(1);
    }

    info!("Stats ingest finished at {}", report.completed_at);
    Ok(())
}
