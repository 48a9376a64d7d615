//! # rollbar-wp Telemetry
//!
//! Crate for the plugin's own logging and metrics. What the plugin reports
//! to Rollbar goes through the reporting backend, not through here.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
