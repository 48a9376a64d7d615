//! ## rollbar-wp-core::backend
//! **Reporting backend seam**
//!
//! The plugin never talks to the Rollbar API directly. It hands a
//! [`ServerConfig`] to a [`ReportingBackend`], which may refuse it, and asks
//! the backend for the client bootstrap snippet. Transport is the backend's
//! business.

use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::error::BackendError;
use crate::value::OptionMap;

/// Loader fetched by the client snippet once `_rollbarConfig` is set.
pub const ROLLBAR_JS_URL: &str =
    "https://cdn.rollbar.com/rollbarjs/refs/tags/v2.26.4/rollbar.min.js";

static ACCESS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9]{32}$").expect("access token pattern compiles"));

/// Log levels understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Server-side backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub access_token: String,
    pub environment: String,
    /// Directory the host code lives in, used for stack-trace linking.
    pub root: String,
    pub included_errno: u32,
    /// Additional backend options merged in through `configure`.
    #[serde(flatten)]
    pub extra: OptionMap,
}

pub trait ReportingBackend: Send + Sync {
    /// Installs the server-side handlers. Fails with
    /// [`BackendError::InvalidArgument`] when the configuration is unusable.
    fn init(&self, config: &ServerConfig) -> Result<(), BackendError>;

    /// Merges extra options into an initialized backend.
    fn configure(&self, extra: &OptionMap) -> Result<(), BackendError>;

    fn log(&self, level: Level, message: &str) -> Result<(), BackendError>;

    /// Drops any installed configuration. Later `log` calls fail with
    /// [`BackendError::NotInitialized`] until the next `init`.
    fn reset(&self);

    /// Embeddable script text bootstrapping the client-side notifier.
    fn client_script(&self, config: &Value) -> String {
        build_js(config)
    }
}

/// Rollbar access tokens are 32 alphanumeric characters.
pub fn validate_access_token(token: &str) -> Result<(), BackendError> {
    if ACCESS_TOKEN.is_match(token) {
        Ok(())
    } else {
        Err(BackendError::InvalidArgument(
            "A 32-character access_token must be specified".into(),
        ))
    }
}

/// Renders the client bootstrap: the config assignment followed by the loader.
pub fn build_js(config: &Value) -> String {
    // "</" inside a JSON string would close the script element early.
    let json = config.to_string().replace("</", "<\\/");
    format!(
        "<script>var _rollbarConfig = {json};</script>\n\
         <script src=\"{ROLLBAR_JS_URL}\" async></script>\n"
    )
}

/// Backend that validates like the real notifier and reports through `tracing`
/// under the `rollbar` target.
#[derive(Debug, Default)]
pub struct TracingBackend {
    config: RwLock<Option<ServerConfig>>,
}

impl TracingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_config(&self) -> Option<ServerConfig> {
        self.config.read().clone()
    }
}

impl ReportingBackend for TracingBackend {
    fn init(&self, config: &ServerConfig) -> Result<(), BackendError> {
        validate_access_token(&config.access_token)?;
        info!(
            target: "rollbar",
            environment = %config.environment,
            root = %config.root,
            included_errno = config.included_errno,
            "Rollbar notifier initialized"
        );
        *self.config.write() = Some(config.clone());
        Ok(())
    }

    fn configure(&self, extra: &OptionMap) -> Result<(), BackendError> {
        let mut guard = self.config.write();
        let config = guard.as_mut().ok_or(BackendError::NotInitialized)?;
        config
            .extra
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        debug!(target: "rollbar", options = extra.len(), "Rollbar notifier reconfigured");
        Ok(())
    }

    fn log(&self, level: Level, message: &str) -> Result<(), BackendError> {
        let guard = self.config.read();
        let config = guard.as_ref().ok_or(BackendError::NotInitialized)?;
        let environment = config.environment.as_str();
        match level {
            Level::Emergency | Level::Alert | Level::Critical | Level::Error => {
                error!(target: "rollbar", %level, environment, "{message}")
            }
            Level::Warning => warn!(target: "rollbar", %level, environment, "{message}"),
            Level::Notice | Level::Info => {
                info!(target: "rollbar", %level, environment, "{message}")
            }
            Level::Debug => trace!(target: "rollbar", %level, environment, "{message}"),
        }
        Ok(())
    }

    fn reset(&self) {
        if self.config.write().take().is_some() {
            debug!(target: "rollbar", "Rollbar notifier reset");
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    inits: Vec<ServerConfig>,
    configured: Vec<OptionMap>,
    logs: Vec<(Level, String)>,
    active: Option<ServerConfig>,
}

/// In-process backend that records every call. Token validation can be
/// switched off to accept any configuration.
#[derive(Debug)]
pub struct MemoryBackend {
    validate: bool,
    fail_transport: RwLock<bool>,
    recorded: Mutex<Recorded>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            validate: true,
            fail_transport: RwLock::new(false),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn permissive() -> Self {
        Self {
            validate: false,
            ..Self::new()
        }
    }

    /// Makes every subsequent `log` call fail with a transport error.
    pub fn set_transport_failure(&self, fail: bool) {
        *self.fail_transport.write() = fail;
    }

    /// Every configuration `init` was called with, accepted or not.
    pub fn init_calls(&self) -> Vec<ServerConfig> {
        self.recorded.lock().inits.clone()
    }

    pub fn configure_calls(&self) -> Vec<OptionMap> {
        self.recorded.lock().configured.clone()
    }

    pub fn log_records(&self) -> Vec<(Level, String)> {
        self.recorded.lock().logs.clone()
    }

    pub fn active_config(&self) -> Option<ServerConfig> {
        self.recorded.lock().active.clone()
    }
}

impl ReportingBackend for MemoryBackend {
    fn init(&self, config: &ServerConfig) -> Result<(), BackendError> {
        let mut recorded = self.recorded.lock();
        recorded.inits.push(config.clone());
        if self.validate {
            validate_access_token(&config.access_token)?;
        }
        recorded.active = Some(config.clone());
        Ok(())
    }

    fn configure(&self, extra: &OptionMap) -> Result<(), BackendError> {
        let mut recorded = self.recorded.lock();
        recorded.configured.push(extra.clone());
        let active = recorded.active.as_mut().ok_or(BackendError::NotInitialized)?;
        active
            .extra
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn log(&self, level: Level, message: &str) -> Result<(), BackendError> {
        if *self.fail_transport.read() {
            return Err(BackendError::Transport("connection refused".into()));
        }
        let mut recorded = self.recorded.lock();
        if recorded.active.is_none() {
            return Err(BackendError::NotInitialized);
        }
        recorded.logs.push((level, message.to_string()));
        Ok(())
    }

    fn reset(&self) {
        self.recorded.lock().active = None;
    }
}
