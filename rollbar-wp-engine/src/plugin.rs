//! The plugin instance: sole owner of the resolved settings.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use rollbar_wp_config::defaults;
use rollbar_wp_config::settings::*;
use rollbar_wp_config::{resolve, EnvOverride, SettingsRecord, SETTINGS_FILTER};
use rollbar_wp_core::backend::{Level, ReportingBackend};
use rollbar_wp_core::hooks::FilterChain;
use rollbar_wp_core::notices::{Notice, NoticeQueue};
use rollbar_wp_core::store::{OptionStore, OPTION_KEY};
use rollbar_wp_core::value::{OptionMap, SettingValue};
use rollbar_wp_telemetry::{EventLogger, MetricsRecorder};

use crate::error::PluginError;
use crate::sequencer::{ClientOutcome, Sequencer, ServerOutcome, JS_CONFIG_FILTER};
use crate::triggers::{Action, Route, Trigger, TriggerTable, TEST_ROUTE};

pub const TEST_MESSAGE: &str =
    "Test message from Rollbar Wordpress plugin using PHP: integration with Wordpress successful";

/// Overrides carried by a test-trigger request. All three are required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestRequest {
    pub server_side_access_token: String,
    pub environment: String,
    pub logging_level: String,
}

pub struct PluginBuilder {
    store: Arc<dyn OptionStore>,
    backend: Arc<dyn ReportingBackend>,
    root: String,
    env: EnvOverride,
    settings_filters: FilterChain<SettingsRecord>,
    js_filters: FilterChain<Value>,
    metrics: MetricsRecorder,
}

impl PluginBuilder {
    pub fn new(store: Arc<dyn OptionStore>, backend: Arc<dyn ReportingBackend>) -> Self {
        Self {
            store,
            backend,
            root: "/var/www/html/".to_string(),
            env: EnvOverride::default(),
            settings_filters: FilterChain::new(SETTINGS_FILTER),
            js_filters: FilterChain::new(JS_CONFIG_FILTER),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn env(mut self, env: EnvOverride) -> Self {
        self.env = env;
        self
    }

    /// Adds a filter to the `rollbar_plugin_settings` chain.
    pub fn settings_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(SettingsRecord) -> SettingsRecord + Send + Sync + 'static,
    {
        self.settings_filters.add(filter);
        self
    }

    /// Adds a filter to the `rollbar_js_config` chain.
    pub fn js_config_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.js_filters.add(filter);
        self
    }

    pub fn metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = metrics;
        self
    }

    /// Resolves settings and assembles the instance. No trigger is
    /// registered yet.
    pub fn build(self) -> Result<Plugin, PluginError> {
        let settings = resolve(self.store.as_ref(), &self.env, &self.settings_filters)?;
        debug!(options = settings.len(), "Settings resolved");

        Ok(Plugin {
            store: self.store,
            backend: self.backend,
            root: self.root,
            js_filters: self.js_filters,
            metrics: self.metrics,
            settings: RwLock::new(settings),
            config: Mutex::new(OptionMap::new()),
            notices: NoticeQueue::new(),
            triggers: RwLock::new(TriggerTable::new()),
            routes: Mutex::new(Vec::new()),
            test_lock: Mutex::new(()),
            server_ready: AtomicBool::new(false),
        })
    }
}

pub struct Plugin {
    store: Arc<dyn OptionStore>,
    backend: Arc<dyn ReportingBackend>,
    root: String,
    js_filters: FilterChain<Value>,
    metrics: MetricsRecorder,
    settings: RwLock<SettingsRecord>,
    /// Extra backend options accumulated through `configure`.
    config: Mutex<OptionMap>,
    notices: NoticeQueue,
    triggers: RwLock<TriggerTable>,
    routes: Mutex<Vec<Route>>,
    test_lock: Mutex<()>,
    /// Set once the live server-side configuration was accepted.
    server_ready: AtomicBool,
}

impl Plugin {
    pub fn builder(
        store: Arc<dyn OptionStore>,
        backend: Arc<dyn ReportingBackend>,
    ) -> PluginBuilder {
        PluginBuilder::new(store, backend)
    }

    fn sequencer<'a>(&'a self, notices: &'a NoticeQueue) -> Sequencer<'a> {
        Sequencer {
            backend: self.backend.as_ref(),
            notices,
            metrics: &self.metrics,
            js_filters: &self.js_filters,
            root: &self.root,
        }
    }

    pub fn setting(&self, name: &str) -> Result<SettingValue, PluginError> {
        Ok(self.settings.read().get(name)?.clone())
    }

    /// In-memory only; see [`Plugin::update_settings`] for persisting.
    pub fn set_setting(&self, name: &str, value: impl Into<SettingValue>) {
        self.settings.write().set(name, value);
    }

    pub fn settings(&self) -> SettingsRecord {
        self.settings.read().clone()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    /// Drains pending notices for rendering.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }

    pub fn register_triggers(&self) {
        *self.triggers.write() = TriggerTable::standard();
        debug!("Triggers registered");
    }

    pub fn init_server_logging(&self) -> Result<ServerOutcome, PluginError> {
        let settings = self.settings.read().clone();
        let extra = self.config.lock().clone();
        let outcome = self
            .sequencer(&self.notices)
            .init_server_logging(&settings, &extra)?;
        self.server_ready
            .store(outcome == ServerOutcome::Initialized, Ordering::SeqCst);
        Ok(outcome)
    }

    pub fn init_client_logging(&self, out: &mut dyn Write) -> Result<ClientOutcome, PluginError> {
        let settings = self.settings.read().clone();
        self.sequencer(&self.notices).init_client_logging(&settings, out)
    }

    /// Client configuration for the current settings, after filters.
    pub fn build_js_config(&self) -> Result<Value, PluginError> {
        let settings = self.settings.read().clone();
        self.sequencer(&self.notices).build_js_config(&settings)
    }

    /// Merges extra backend options and forwards them if the backend is
    /// already running.
    pub fn configure(&self, extra: OptionMap) -> Result<(), PluginError> {
        let mut config = self.config.lock();
        config.extend(extra);
        if self.server_ready.load(Ordering::SeqCst) {
            self.backend.configure(&config)?;
        }
        Ok(())
    }

    /// Merges `changes` into the persisted options and the live settings.
    #[instrument(level = "debug", skip_all, fields(options = changes.len()))]
    pub fn update_settings(&self, changes: OptionMap) -> Result<(), PluginError> {
        let mut settings = self.settings.write();
        let mut persisted = self.store.get(OPTION_KEY)?.unwrap_or_default();
        persisted.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.store.set(OPTION_KEY, &persisted)?;
        settings.extend(changes);
        Ok(())
    }

    /// Writes the registry default of every option, live and persisted.
    pub fn restore_defaults(&self) -> Result<(), PluginError> {
        self.update_settings(defaults::defaults())?;
        EventLogger::log_event("defaults_restored", vec![]);
        Ok(())
    }

    /// Persists the plugin keys when nothing is stored yet. Returns whether
    /// the store was written.
    pub fn seed_store(&self) -> Result<bool, PluginError> {
        if self.store.get(OPTION_KEY)?.is_some() {
            return Ok(false);
        }
        let settings = self.settings.read();
        let mut seed = OptionMap::new();
        for key in PLUGIN_KEYS {
            seed.insert(key.to_string(), settings.get(key)?.clone());
        }
        self.store.set(OPTION_KEY, &seed)?;
        info!("Seeded option store with initial settings");
        Ok(true)
    }

    /// Runs every action registered for `trigger`. Client snippets are
    /// written to `out`.
    pub fn dispatch(&self, trigger: Trigger, out: &mut dyn Write) -> Result<(), PluginError> {
        let actions = self.triggers.read().actions(trigger).to_vec();
        debug!(%trigger, actions = actions.len(), "Dispatching trigger");
        for action in actions {
            match action {
                Action::InitServerLogging => {
                    self.init_server_logging()?;
                }
                Action::InitClientLogging => {
                    self.init_client_logging(out)?;
                }
                Action::RegisterTestEndpoint => {
                    let mut routes = self.routes.lock();
                    if !routes.contains(&TEST_ROUTE) {
                        routes.push(TEST_ROUTE);
                    }
                }
            }
        }
        Ok(())
    }

    /// Initializes against the request's overrides and sends one test
    /// message.
    ///
    /// Works on a private copy of the live settings and runs are serialized.
    /// Afterwards the backend holds the live server-side configuration
    /// again, or none at all when live logging is off or was rejected.
    #[instrument(level = "debug", skip_all, fields(environment = %request.environment))]
    pub fn test_php_logging(&self, request: &TestRequest) -> Result<(), PluginError> {
        let _guard = self.test_lock.lock();

        let result = self.run_test(request);
        let success = result.is_ok();
        self.metrics.inc_test_run(success);
        EventLogger::log_event(
            "test_php_logging",
            vec![
                KeyValue::new("environment", request.environment.clone()),
                KeyValue::new("success", success),
            ],
        );

        self.restore_live_backend();
        result
    }

    /// Puts the live server-side configuration back after a test run, or
    /// leaves the backend unconfigured when there is none.
    fn restore_live_backend(&self) {
        if !self.server_ready.load(Ordering::SeqCst) {
            self.backend.reset();
            return;
        }
        match self.init_server_logging() {
            Ok(ServerOutcome::Initialized) => {}
            Ok(outcome) => {
                warn!(?outcome, "Live server-side configuration no longer accepted");
                self.backend.reset();
            }
            Err(e) => {
                warn!(error = %e, "Failed to reinstate live server-side configuration");
                self.backend.reset();
            }
        }
    }

    fn run_test(&self, request: &TestRequest) -> Result<(), PluginError> {
        let mut settings = self.settings.read().clone();
        settings.set(PHP_LOGGING_ENABLED, SettingValue::Int(1));
        settings.set(SERVER_SIDE_ACCESS_TOKEN, request.server_side_access_token.trim());
        settings.set(ENVIRONMENT, request.environment.as_str());
        settings.set(LOGGING_LEVEL, request.logging_level.trim());
        let extra = self.config.lock().clone();

        // Notices from a test run are not for the admin screens.
        let scratch = NoticeQueue::new();
        match self.sequencer(&scratch).init_server_logging(&settings, &extra)? {
            ServerOutcome::Initialized => {}
            ServerOutcome::Misconfigured | ServerOutcome::Skipped => {
                return Err(PluginError::Misconfigured)
            }
        }

        self.backend.log(Level::Info, TEST_MESSAGE)?;
        Ok(())
    }
}
