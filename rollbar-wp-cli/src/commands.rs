use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use rollbar_wp_config::PluginConfig;
use rollbar_wp_core::backend::TracingBackend;
use rollbar_wp_core::store::JsonFileStore;
use rollbar_wp_engine::{global, Plugin, PluginBuilder, TestRequest, Trigger};
use rollbar_wp_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(name = "rollbar-wp", version, about)]
pub struct Cli {
    /// Host configuration file. Defaults to config/rollbar-wp.yaml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved settings as JSON
    Show,
    /// Print one resolved setting
    Get(GetArgs),
    /// Write the default of every registry option to the store
    RestoreDefaults,
    /// Send a test message with the given server-side settings
    Test(TestArgs),
    /// Serve the test endpoint
    Serve(ServeArgs),
    /// Print the client-side bootstrap snippet
    ClientScript,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    pub option: String,
}

#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    #[arg(long)]
    pub token: String,
    #[arg(long, default_value = "production")]
    pub environment: String,
    #[arg(long, default_value = "E_ERROR")]
    pub level: String,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Overrides `listen_addr` from the configuration.
    #[arg(long)]
    pub addr: Option<SocketAddr>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<PluginConfig> {
    let config = match path {
        Some(path) => PluginConfig::load_from_path(path),
        None => PluginConfig::load(),
    };
    config.context("Failed to load host configuration")
}

pub fn plugin_builder(config: &PluginConfig, metrics: MetricsRecorder) -> PluginBuilder {
    Plugin::builder(
        Arc::new(JsonFileStore::new(&config.store_path)),
        Arc::new(TracingBackend::new()),
    )
    .root(config.root.clone())
    .env(config.env_override())
    .metrics(metrics)
}

pub async fn run_command(cli: Cli, metrics: MetricsRecorder) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let plugin = global()
        .instance(|| plugin_builder(&config, metrics))
        .context("Failed to initialize plugin")?;

    let result = execute(cli.command, &config, plugin.clone()).await;

    for notice in plugin.take_notices() {
        eprintln!("notice: {notice}");
    }
    result
}

async fn execute(
    command: Commands,
    config: &PluginConfig,
    plugin: Arc<Plugin>,
) -> anyhow::Result<()> {
    match command {
        Commands::Show => {
            println!("{}", serde_json::to_string_pretty(&plugin.settings())?);
        }
        Commands::Get(args) => {
            println!("{}", plugin.setting(&args.option)?);
        }
        Commands::RestoreDefaults => {
            plugin.restore_defaults()?;
            println!("Defaults restored");
        }
        Commands::Test(args) => {
            let request = TestRequest {
                server_side_access_token: args.token,
                environment: args.environment,
                logging_level: args.level,
            };
            match plugin.test_php_logging(&request) {
                Ok(()) => println!("200 OK"),
                Err(e) => bail!("500 Internal Server Error: {e}"),
            }
        }
        Commands::Serve(args) => {
            let addr = match args.addr {
                Some(addr) => addr,
                None => config
                    .listen_addr
                    .parse()
                    .with_context(|| format!("Invalid listen_addr {}", config.listen_addr))?,
            };
            plugin.dispatch(Trigger::Bootstrap, &mut io::sink())?;
            plugin.dispatch(Trigger::RestApiInit, &mut io::sink())?;
            info!(%addr, "Serving test endpoint");
            rollbar_wp_api::serve(addr, plugin).await?;
        }
        Commands::ClientScript => {
            let mut out = io::stdout().lock();
            plugin.dispatch(Trigger::PageHead, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
