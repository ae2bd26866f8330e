//! CLI definitions for PromptPilot.

use std::path::PathBuf;

use clap::Parser;

/// PromptPilot CLI.
#[derive(Parser)]
#[command(name = "promptpilot")]
#[command(about = "Extension core for prompt-driven image generation automation")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Orchestration server WebSocket URL (overrides the config file)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Simulated generation latency in milliseconds (overrides the config file)
    #[arg(long)]
    pub artifact_delay_ms: Option<u64>,
}
