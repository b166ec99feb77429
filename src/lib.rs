//! checkin - guided check-in session engine
//!
//! This library drives a couple through a fixed sequence of conversation
//! steps, with persisted countdown timers and couple-specific settings.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `checkin`: Step sequence, session model, pure reducer and the
//!   local-first `CheckInContext`
//! - `timer`: Session timer and turn clock with crash-recovery persistence
//! - `settings`: Named templates and active-settings resolution
//! - `storage`: Repository traits with in-memory and sled backends
//! - `realtime`: Change events from the partner's device
//! - `config`: Configuration management and validation
//! - `logging`: tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use checkin::{CheckInContext, Config, MemoryStore, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let mut ctx = CheckInContext::new(
//!         store,
//!         config.workspace.couple_id.as_str(),
//!         config.workspace.user_id.as_str(),
//!         Arc::new(SystemClock),
//!     );
//!     ctx.load().await;
//!     ctx.start_check_in(vec!["communication".to_string()], None).await?;
//!     Ok(())
//! }
//! ```

pub mod checkin;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod realtime;
pub mod settings;
pub mod storage;
pub mod timer;

// Re-export commonly used types
pub use checkin::{CheckInContext, CheckInSession, CheckInState, Step};
pub use config::Config;
pub use error::{CheckInError, Result};
pub use settings::{SessionSettings, SettingsCatalogue};
pub use storage::{MemoryStore, SledStore};
pub use timer::{SessionTimer, SystemClock, TurnClock};

#[cfg(test)]
pub mod test_utils;
