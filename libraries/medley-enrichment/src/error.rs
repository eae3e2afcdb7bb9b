//! Error types for enrichment

use medley_core::MedleyError;
use thiserror::Error;

/// Errors raised while setting up or driving enrichment
///
/// Per-job failures are not errors: they are reported as
/// [`EnrichmentEvent::Failed`](crate::EnrichmentEvent::Failed).
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Core error: {0}")]
    Core(#[from] MedleyError),

    /// HTTP client could not be built or a request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The queue was shut down and accepts no more jobs
    #[error("Enrichment queue is shut down")]
    QueueShutDown,

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
