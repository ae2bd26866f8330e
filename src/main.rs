//! PromptPilot - extension core for prompt-driven image generation.
//!
//! Runs the full pipeline (connection, dispatch, detection, execution)
//! against a simulated host page, connected to a real orchestration server.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod handlers;
mod sim;

use app::App;
use cli::Cli;
use config::AppConfig;
use sim::SimulatedAdapter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    info!("Starting PromptPilot v{}", env!("CARGO_PKG_VERSION"));
    info!("Orchestration server: {}", config.connection.server_url);
    info!(
        "Simulated page, generation latency {} ms",
        config.sim.artifact_delay_ms
    );

    let adapter = Arc::new(SimulatedAdapter::new(config.sim.clone()));
    let app = App::new(&config, adapter);
    app.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    app.shutdown().await;

    Ok(())
}
