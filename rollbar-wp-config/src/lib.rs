//! # rollbar-wp Configuration System
//!
//! Two layers of configuration live here:
//!
//! - **Plugin settings**: the option registry with its defaults, the
//!   [`SettingsRecord`] and the resolver merging persisted options, the
//!   deployment environment variable and defaults.
//! - **Host configuration**: [`PluginConfig`], describing where the host keeps
//!   its option store and code, loaded with `figment` from defaults, a YAML
//!   file and `ROLLBAR_WP_*` variables.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

pub mod defaults;
mod error;
pub mod resolver;
pub mod settings;
mod validation;

pub use error::{ConfigError, SettingsError};
pub use resolver::{resolve, EnvOverride, SETTINGS_FILTER};
pub use settings::SettingsRecord;

/// Default location of the host configuration file.
pub const CONFIG_FILE: &str = "config/rollbar-wp.yaml";

/// Host-side configuration for the plugin runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PluginConfig {
    /// Directory the host application is installed in. Sent to the backend
    /// for stack-trace linking.
    #[validate(length(min = 1))]
    #[serde(default = "default_root")]
    pub root: String,

    /// JSON file backing the option store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Variable consulted when no environment is persisted.
    #[validate(custom(function = validation::validate_env_var_name))]
    #[serde(default = "default_environment_var")]
    pub environment_var: String,

    /// Bind address of the test endpoint.
    #[validate(custom(function = validation::validate_listen_addr))]
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_root() -> String {
    "/var/www/html/".into()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/options.json")
}

fn default_environment_var() -> String {
    resolver::DEFAULT_ENVIRONMENT_VAR.into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            store_path: default_store_path(),
            environment_var: default_environment_var(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl PluginConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/rollbar-wp.yaml`, if present.
    /// 3. `ROLLBAR_WP_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(PluginConfig::default()));

        if Path::new(CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(CONFIG_FILE));
        } else {
            info!("{} not found, using default configuration", CONFIG_FILE);
        }

        Self::extract(figment.merge(Env::prefixed("ROLLBAR_WP_").split("__")))
    }

    /// Load configuration from a specific path, still honouring the
    /// environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(PluginConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed("ROLLBAR_WP_").split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        debug!(?config, "Loaded plugin configuration");
        Ok(config)
    }

    pub fn env_override(&self) -> EnvOverride {
        EnvOverride::process(self.environment_var.clone())
    }
}
