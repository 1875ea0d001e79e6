//! # Push Notification Sample
//!
//! Runs the activation flow against the in-process platform. The activation kind, the
//! channel script and any foreground deliveries come from the `simulation` section of
//! the configuration; the command line can override the most common knobs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use push_notify::config::ConfigManager;
use push_notify::console::StdConsole;
use push_notify::logging::init_structured_logging;
use push_notify::platform::SimulatedPlatform;
use push_notify::ActivationDispatcher;

#[derive(Parser)]
#[command(name = "push-sample")]
#[command(about = "Register for and receive push notifications")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Activation kind to simulate: launch, push, or any other name
    #[arg(short, long)]
    activation: Option<String>,

    /// Payload delivered with a push activation
    #[arg(short, long)]
    payload: Option<String>,

    /// Channel request timeout in seconds
    #[arg(short, long)]
    timeout_secs: Option<u64>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Arc<ConfigManager>> {
    let manager = match &cli.environment {
        Some(environment) => {
            ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        }
        None => ConfigManager::load_from_directory(cli.config_dir.clone()),
    };
    manager.context("failed to load push sample configuration")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (manager, load_error) = match load_config(&cli) {
        Ok(manager) => (manager, None),
        Err(e) => (ConfigManager::fallback(), Some(e)),
    };

    let mut config = manager.config().clone();
    init_structured_logging(&config.logging);
    if let Some(e) = load_error {
        warn!("{e:#}; continuing with defaults");
    }

    if let Some(activation) = cli.activation {
        config.simulation.activation = activation;
    }
    if let Some(payload) = cli.payload {
        config.simulation.payload = payload;
    }
    if let Some(timeout_secs) = cli.timeout_secs.filter(|secs| *secs > 0) {
        config.channel_request_timeout_seconds = timeout_secs;
    }

    let platform = Arc::new(SimulatedPlatform::from_config(&config.simulation));
    let feed = platform.spawn_foreground_feed(
        config.simulation.foreground_payloads.clone(),
        Duration::from_millis(config.simulation.step_delay_ms),
    );

    let dispatcher = ActivationDispatcher::new(
        &config,
        platform.clone(),
        platform.clone(),
        Arc::new(StdConsole::new()),
    );
    let report = dispatcher.run().await;
    feed.abort();

    let stats = dispatcher.negotiator().stats();
    info!(
        activation_kind = %report.kind,
        state = %report.final_state,
        channel_acquired = report.channel_acquired(),
        foreground_notifications = report.foreground_notifications,
        channel_requests = stats.requests,
        channel_retries = stats.retry_events,
        "Push sample finished"
    );
    match serde_json::to_string(&report) {
        Ok(json) => tracing::debug!(report = %json, "Dispatch report"),
        Err(e) => warn!("Failed to serialize dispatch report: {e}"),
    }
}
