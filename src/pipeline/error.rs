//! Error types for the harvest pipeline.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::ClientError;
use crate::store::StoreError;

/// Errors that end a harvest run.
///
/// Per-attempt fetch failures never show up here; they are settled by the
/// fetch policy inside the workers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The sink failed; nothing after this point was persisted.
    #[error("sink failure: {0}")]
    Store(#[from] StoreError),

    /// Reading the domain list failed part way through.
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// The persistence task panicked or was cancelled.
    #[error("persistence task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
