//! CLI entry point for SkillMart.
//!
//! This binary provides the `skillmart` command: slug tooling, publishing,
//! install/review bookkeeping and profile achievements.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{ConfigSource, SkillmartConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine.
    let dotenv = dotenvy::dotenv().ok();

    let (config, source) = SkillmartConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    if let Some(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "configuration loaded"),
        ConfigSource::Defaults => warn!("no config file found, using defaults"),
    }

    commands::run(cli.command, config, cli.json).await
}

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG` overrides `default_level` when set.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
