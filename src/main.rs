//! checkin - guided relationship check-ins from the terminal
//!
#![doc = "Main entry point for the checkin CLI."]

use anyhow::Result;

use checkin::cli::Cli;
use checkin::commands;
use checkin::config::Config;
use checkin::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Initialize tracing from the resolved logging section
    logging::init_logging(&config.logging)?;

    // Validate configuration
    config.validate()?;

    tracing::debug!(
        couple_id = %config.workspace.couple_id,
        user_id = %config.workspace.user_id,
        "Configuration loaded"
    );

    commands::run(config, cli.command).await
}
