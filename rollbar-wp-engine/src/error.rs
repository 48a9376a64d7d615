use thiserror::Error;

use rollbar_wp_config::SettingsError;
use rollbar_wp_core::{BackendError, StoreError};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Option store error: {0}")]
    Store(#[from] StoreError),

    #[error("Reporting backend error: {0}")]
    Backend(#[from] BackendError),

    /// The backend refused the configuration built from the test request.
    #[error("Reporting backend rejected the configuration")]
    Misconfigured,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
