//! Initialization sequencing for the server-side and client-side notifiers.
//!
//! Both paths are fail-soft: a configuration the backend refuses, or a
//! missing client token, becomes a deferred admin notice and the caller
//! carries on. Only faults outside configuration (store, I/O, transport)
//! surface as errors.

use std::io::Write;

use opentelemetry::KeyValue;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use rollbar_wp_config::settings::*;
use rollbar_wp_config::SettingsRecord;
use rollbar_wp_core::backend::{ReportingBackend, ServerConfig};
use rollbar_wp_core::hooks::FilterChain;
use rollbar_wp_core::notices::{Notice, NoticeQueue};
use rollbar_wp_core::severity::{build_included_mask, Severity};
use rollbar_wp_core::value::OptionMap;
use rollbar_wp_core::BackendError;
use rollbar_wp_telemetry::{EventLogger, MetricsRecorder};

use crate::error::PluginError;

/// Filter point over the client configuration object.
pub const JS_CONFIG_FILTER: &str = "rollbar_js_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOutcome {
    /// Server-side logging is switched off.
    Skipped,
    Initialized,
    /// The configuration was refused; a notice was queued.
    Misconfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOutcome {
    /// Client-side logging is switched off.
    Skipped,
    /// No client token; a notice was queued and nothing was written.
    TokenMissing,
    Emitted,
}

/// Borrowed view of everything one initialization pass needs.
pub struct Sequencer<'a> {
    pub backend: &'a dyn ReportingBackend,
    pub notices: &'a NoticeQueue,
    pub metrics: &'a MetricsRecorder,
    pub js_filters: &'a FilterChain<Value>,
    /// Host install directory for stack-trace linking.
    pub root: &'a str,
}

impl Sequencer<'_> {
    /// Builds the server configuration from `settings` and hands it to the
    /// backend. `extra` holds options accumulated through `configure`.
    #[instrument(level = "debug", skip_all)]
    pub fn init_server_logging(
        &self,
        settings: &SettingsRecord,
        extra: &OptionMap,
    ) -> Result<ServerOutcome, PluginError> {
        if !settings.enabled(PHP_LOGGING_ENABLED)? {
            debug!("Server-side logging disabled");
            return Ok(ServerOutcome::Skipped);
        }

        let level = settings.string(LOGGING_LEVEL)?;
        let threshold = match level.parse::<Severity>() {
            Ok(threshold) => threshold,
            Err(e) => {
                warn!(error = %e, "Unusable logging level");
                self.register(Notice::Misconfigured);
                return Ok(ServerOutcome::Misconfigured);
            }
        };

        let config = ServerConfig {
            access_token: settings.string(SERVER_SIDE_ACCESS_TOKEN)?,
            environment: settings.string(ENVIRONMENT)?,
            root: self.root.to_string(),
            included_errno: build_included_mask(threshold),
            extra: extra.clone(),
        };

        self.metrics.backend_inits.inc();
        match self.backend.init(&config) {
            Ok(()) => {
                EventLogger::log_event(
                    "server_logging_initialized",
                    vec![
                        KeyValue::new("environment", config.environment.clone()),
                        KeyValue::new("included_errno", i64::from(config.included_errno)),
                    ],
                );
                Ok(ServerOutcome::Initialized)
            }
            Err(BackendError::InvalidArgument(reason)) => {
                warn!(%reason, "Reporting backend rejected the configuration");
                self.metrics.misconfigurations.inc();
                self.register(Notice::Misconfigured);
                Ok(ServerOutcome::Misconfigured)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the client bootstrap snippet to `out` when client logging is
    /// on and a token is set.
    #[instrument(level = "debug", skip_all)]
    pub fn init_client_logging(
        &self,
        settings: &SettingsRecord,
        out: &mut dyn Write,
    ) -> Result<ClientOutcome, PluginError> {
        if !settings.enabled(JS_LOGGING_ENABLED)? {
            debug!("Client-side logging disabled");
            return Ok(ClientOutcome::Skipped);
        }

        if settings.string(CLIENT_SIDE_ACCESS_TOKEN)?.is_empty() {
            self.register(Notice::ClientTokenMissing);
            return Ok(ClientOutcome::TokenMissing);
        }

        let script = self.backend.client_script(&self.build_js_config(settings)?);
        out.write_all(script.as_bytes())?;
        self.metrics.client_snippets.inc();
        Ok(ClientOutcome::Emitted)
    }

    /// Client configuration after the `rollbar_js_config` filters ran.
    pub fn build_js_config(&self, settings: &SettingsRecord) -> Result<Value, PluginError> {
        let config = json!({
            "accessToken": settings.string(CLIENT_SIDE_ACCESS_TOKEN)?,
            "captureUncaught": true,
            "payload": {
                "environment": settings.string(ENVIRONMENT)?,
            },
        });
        Ok(self.js_filters.apply(config))
    }

    fn register(&self, notice: Notice) {
        if self.notices.register(notice) {
            let label = match notice {
                Notice::Misconfigured => "misconfigured",
                Notice::ClientTokenMissing => "client_token_missing",
            };
            self.metrics.inc_notice(label);
            EventLogger::log_event("notice_registered", vec![KeyValue::new("notice", label)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbar_wp_core::backend::MemoryBackend;
    use rollbar_wp_core::value::SettingValue;

    const TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    struct Fixture {
        backend: MemoryBackend,
        notices: NoticeQueue,
        metrics: MetricsRecorder,
        js_filters: FilterChain<Value>,
    }

    impl Fixture {
        fn new(backend: MemoryBackend) -> Self {
            Self {
                backend,
                notices: NoticeQueue::new(),
                metrics: MetricsRecorder::new(),
                js_filters: FilterChain::new(JS_CONFIG_FILTER),
            }
        }

        fn sequencer(&self) -> Sequencer<'_> {
            Sequencer {
                backend: &self.backend,
                notices: &self.notices,
                metrics: &self.metrics,
                js_filters: &self.js_filters,
                root: "/srv/www/",
            }
        }
    }

    fn settings(pairs: &[(&str, SettingValue)]) -> SettingsRecord {
        let mut record = SettingsRecord::new();
        record.set(PHP_LOGGING_ENABLED, SettingValue::Int(0));
        record.set(JS_LOGGING_ENABLED, SettingValue::Int(0));
        record.set(SERVER_SIDE_ACCESS_TOKEN, "");
        record.set(CLIENT_SIDE_ACCESS_TOKEN, "");
        record.set(LOGGING_LEVEL, SettingValue::Int(1));
        record.set(ENVIRONMENT, "production");
        for (name, value) in pairs {
            record.set(name, value.clone());
        }
        record
    }

    #[test]
    fn disabled_server_logging_touches_nothing() {
        let fx = Fixture::new(MemoryBackend::new());
        let outcome = fx
            .sequencer()
            .init_server_logging(&settings(&[]), &OptionMap::new())
            .unwrap();
        assert_eq!(outcome, ServerOutcome::Skipped);
        assert!(fx.backend.init_calls().is_empty());
        assert!(fx.notices.pending().is_empty());
    }

    #[test]
    fn server_config_carries_mask_and_root() {
        let fx = Fixture::new(MemoryBackend::new());
        let record = settings(&[
            (PHP_LOGGING_ENABLED, SettingValue::Int(1)),
            (SERVER_SIDE_ACCESS_TOKEN, TOKEN.into()),
            (LOGGING_LEVEL, "E_WARNING".into()),
            (ENVIRONMENT, "qa".into()),
        ]);
        let mut extra = OptionMap::new();
        extra.insert("code_version".into(), "abc123".into());

        let outcome = fx.sequencer().init_server_logging(&record, &extra).unwrap();
        assert_eq!(outcome, ServerOutcome::Initialized);

        let calls = fx.backend.init_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].access_token, TOKEN);
        assert_eq!(calls[0].environment, "qa");
        assert_eq!(calls[0].root, "/srv/www/");
        assert_eq!(calls[0].included_errno, 1 | 2);
        assert_eq!(calls[0].extra.get("code_version"), Some(&SettingValue::from("abc123")));
    }

    #[test]
    fn rejected_config_is_fail_soft() {
        let fx = Fixture::new(MemoryBackend::new());
        let record = settings(&[(PHP_LOGGING_ENABLED, SettingValue::Int(1))]);
        let outcome = fx
            .sequencer()
            .init_server_logging(&record, &OptionMap::new())
            .unwrap();
        assert_eq!(outcome, ServerOutcome::Misconfigured);
        assert_eq!(fx.notices.pending(), vec![Notice::Misconfigured]);
        assert_eq!(fx.metrics.misconfigurations.get(), 1);
    }

    #[test]
    fn unparseable_level_is_misconfiguration() {
        let fx = Fixture::new(MemoryBackend::new());
        let record = settings(&[
            (PHP_LOGGING_ENABLED, SettingValue::Int(1)),
            (SERVER_SIDE_ACCESS_TOKEN, TOKEN.into()),
            (LOGGING_LEVEL, "loud".into()),
        ]);
        let outcome = fx
            .sequencer()
            .init_server_logging(&record, &OptionMap::new())
            .unwrap();
        assert_eq!(outcome, ServerOutcome::Misconfigured);
        assert!(fx.backend.init_calls().is_empty());
    }

    #[test]
    fn transport_faults_propagate() {
        struct Broken;
        impl ReportingBackend for Broken {
            fn init(&self, _: &ServerConfig) -> Result<(), BackendError> {
                Err(BackendError::Transport("down".into()))
            }
            fn configure(&self, _: &OptionMap) -> Result<(), BackendError> {
                Ok(())
            }
            fn log(
                &self,
                _: rollbar_wp_core::backend::Level,
                _: &str,
            ) -> Result<(), BackendError> {
                Ok(())
            }
            fn reset(&self) {}
        }

        let fx = Fixture::new(MemoryBackend::new());
        let sequencer = Sequencer {
            backend: &Broken,
            ..fx.sequencer()
        };
        let record = settings(&[(PHP_LOGGING_ENABLED, SettingValue::Int(1))]);
        assert!(matches!(
            sequencer.init_server_logging(&record, &OptionMap::new()),
            Err(PluginError::Backend(BackendError::Transport(_)))
        ));
    }

    #[test]
    fn missing_client_token_emits_nothing() {
        let fx = Fixture::new(MemoryBackend::new());
        let record = settings(&[(JS_LOGGING_ENABLED, SettingValue::Int(1))]);
        let mut out = Vec::new();
        let outcome = fx.sequencer().init_client_logging(&record, &mut out).unwrap();
        assert_eq!(outcome, ClientOutcome::TokenMissing);
        assert!(out.is_empty());
        assert_eq!(fx.notices.pending(), vec![Notice::ClientTokenMissing]);
    }

    #[test]
    fn disabled_client_logging_is_silent() {
        let fx = Fixture::new(MemoryBackend::new());
        let mut out = Vec::new();
        let outcome = fx
            .sequencer()
            .init_client_logging(&settings(&[]), &mut out)
            .unwrap();
        assert_eq!(outcome, ClientOutcome::Skipped);
        assert!(out.is_empty());
        assert!(fx.notices.pending().is_empty());
    }

    #[test]
    fn client_snippet_goes_through_filters() {
        let mut fx = Fixture::new(MemoryBackend::new());
        fx.js_filters.add(|mut config: Value| {
            config["captureUnhandledRejections"] = Value::Bool(true);
            config
        });
        let record = settings(&[
            (JS_LOGGING_ENABLED, SettingValue::Int(1)),
            (CLIENT_SIDE_ACCESS_TOKEN, "client-token".into()),
            (ENVIRONMENT, "staging".into()),
        ]);
        let mut out = Vec::new();
        let outcome = fx.sequencer().init_client_logging(&record, &mut out).unwrap();
        assert_eq!(outcome, ClientOutcome::Emitted);

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains(r#""accessToken":"client-token""#));
        assert!(script.contains(r#""captureUncaught":true"#));
        assert!(script.contains(r#""environment":"staging""#));
        assert!(script.contains(r#""captureUnhandledRejections":true"#));
    }
}
