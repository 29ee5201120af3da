use std::time::Duration;
use thiserror::Error;

/// Unified error type for the Beer Exporter.
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ExporterError {
    fn from(e: figment::Error) -> Self {
        ExporterError::Config(e.to_string())
    }
}
