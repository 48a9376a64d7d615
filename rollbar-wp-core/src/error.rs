use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a reporting backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused the configuration it was given.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Reporting backend is not initialized")]
    NotInitialized,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Failures of the host option store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Option store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Option store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
