//! ## rollbar-wp
//! **Operator interface for the plugin**
//!
//! Resolves settings against the configured option store, runs the
//! server-side test, prints the client snippet and serves the test
//! endpoint.

use clap::Parser;
use rollbar_wp_telemetry::{EventLogger, MetricsRecorder};

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli, MetricsRecorder::new()).await
}
