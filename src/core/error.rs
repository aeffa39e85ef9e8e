//! Error types for the isoview engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Flag error: {0}")]
    Flags(String),

    #[error("Visibility error: {0}")]
    Visibility(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
