//! Error types for the ingestion pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while fetching, merging or persisting statistics
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status
    #[error("Provider request to {endpoint} failed with status {status}")]
    ProviderStatus { endpoint: String, status: u16 },

    /// Provider answered 2xx but the body is missing what we need
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Merge error for player {player_id}: {reason}")]
    Merge { player_id: String, reason: String },

    #[error("Could not resolve player {player_id}: {reason}")]
    Resolution { player_id: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn merge(player_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Merge { player_id: player_id.into(), reason: reason.into() }
    }

    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse { endpoint: endpoint.into(), reason: reason.into() }
    }

    /// Transport-level failures (network, status, bad body) as opposed to data problems
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::ProviderStatus { .. } | Self::MalformedResponse { .. }
        )
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
