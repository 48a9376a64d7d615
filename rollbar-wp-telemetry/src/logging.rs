//! ## rollbar-wp-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! Lifecycle events (plugin construction, backend initialization, notices,
//! test runs) are emitted inside a `plugin_event` span carrying the event
//! type, with free-form metadata attached as `KeyValue` pairs.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Returns false if one was already set.
    pub fn init() -> bool {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init()
            .is_ok()
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!("plugin_event", event_type = event_type, otel.kind = "INTERNAL");
        span.in_scope(|| {
            tracing::info!(metadata = ?metadata, "Plugin event: {}", event_type);
        });
    }
}
