//! Error types for the check-in engine
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for check-in operations
///
/// Most failures inside the engine are recovered locally (reducer no-ops,
/// timer storage fallbacks, settings fallbacks). The variants here cover the
/// failures that are reported to a caller.
#[derive(Error, Debug)]
pub enum CheckInError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence backend errors (create/read/update/delete failed)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record addressed by id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An illegal step transition was requested
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// An operation required an active session but none is loaded
    #[error("No active check-in session")]
    NoActiveSession,

    /// A new session was requested while one is still in progress
    #[error("A check-in session is already in progress: {0}")]
    SessionAlreadyActive(String),

    /// Settings row or template problems
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for check-in operations
///
/// Uses `anyhow::Error` so callers get rich context while domain failures
/// remain downcastable to [`CheckInError`].
pub type Result<T> = anyhow::Result<T>;
