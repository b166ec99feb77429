/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `session`: Start, navigate, annotate, save, complete and abandon check-ins
- `timer`: Session timer and turn clock controls
- `settings`: Template listing and promotion

Every handler opens the sled store at the configured path, builds the
engine component it needs, performs one operation and prints the result.
*/

use std::sync::Arc;

use crate::cli::Commands;
use crate::config::Config;
use crate::error::Result;
use crate::settings::{SessionSettings, SettingsCatalogue};
use crate::storage::SledStore;

pub mod session;
pub mod settings;
pub mod timer;

/// Dispatch a parsed command
pub async fn run(config: Config, command: Commands) -> Result<()> {
    let store = open_store(&config)?;

    match command {
        Commands::Start { categories, mood } => {
            session::start(&config, store, categories, mood).await
        }
        Commands::Status => session::status(&config, store).await,
        Commands::Step { command } => session::step(&config, store, command).await,
        Commands::Note { command } => session::note(&config, store, command).await,
        Commands::Save => session::save(&config, store).await,
        Commands::Complete { mood, reflection } => {
            session::complete(&config, store, mood, reflection).await
        }
        Commands::Abandon => session::abandon(&config, store).await,
        Commands::Timer { command } => timer::handle_timer(&config, store, command).await,
        Commands::Turn { command } => timer::handle_turn(&config, store, command).await,
        Commands::Settings { command } => {
            settings::handle_settings(&config, store, command).await
        }
    }
}

/// Open the sled store at the configured (or default) location
pub fn open_store(config: &Config) -> Result<Arc<SledStore>> {
    let path = config.storage.resolve_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!("Opening store at {}", path.display());
    Ok(Arc::new(SledStore::open(&path)?))
}

/// Resolve the couple's active settings
pub async fn active_settings(config: &Config, store: Arc<SledStore>) -> SessionSettings {
    let mut catalogue = SettingsCatalogue::new(store, config.workspace.couple_id.as_str());
    catalogue.load().await.clone()
}
