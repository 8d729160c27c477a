//! Orchestration error taxonomy.
//!
//! Probe-level failures and timeouts never appear here: the executor turns
//! them into failed [`ProbeResult`](crate::domain::ProbeResult)s. What remains
//! are the conditions that stop a run before or around probe execution.

use crate::report::ReportFormat;

/// Errors produced by the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum OrchestraError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("aggregation error: {0}")]
    Aggregation(String),

    #[error("{format} report emission failed: {reason}")]
    ReportEmission { format: ReportFormat, reason: String },

    #[error("cleanup of probe {probe} failed: {reason}")]
    Cleanup { probe: String, reason: String },

    #[error("a run is already in progress on this orchestrator")]
    AlreadyRunning,

    #[error("internal orchestration error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestraError {
    /// Shorthand for a [`OrchestraError::Configuration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Shorthand for a [`OrchestraError::Aggregation`].
    pub fn aggregation(msg: impl Into<String>) -> Self {
        Self::Aggregation(msg.into())
    }
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestraError>;
