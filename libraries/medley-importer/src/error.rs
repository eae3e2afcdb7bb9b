//! Error types for the importer

use medley_core::MedleyError;
use medley_enrichment::EnrichmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Core(#[from] MedleyError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Copied bytes differ from the source
    #[error("File verification failed: {0}")]
    VerificationFailed(String),
}
