//! Configuration management for the check-in CLI
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CheckInError, Result};
use crate::storage::SledStore;
use crate::timer::TurnClockOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where check-ins, notes, settings and timer slots are stored
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identity the CLI acts as
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Timer slot keys
    #[serde(default)]
    pub timer: TimerConfig,

    /// Turn extension limits
    #[serde(default)]
    pub turn: TurnConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory; the platform data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured path, or the platform default
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => SledStore::default_path(),
        }
    }
}

/// Couple and user identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_couple_id")]
    pub couple_id: String,

    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_couple_id() -> String {
    "local-couple".to_string()
}

fn default_user_id() -> String {
    "local-user".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            couple_id: default_couple_id(),
            user_id: default_user_id(),
        }
    }
}

/// Keys of the persisted timer slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_session_key")]
    pub session_key: String,

    #[serde(default = "default_turn_key")]
    pub turn_key: String,
}

fn default_session_key() -> String {
    "checkin-session-timer".to_string()
}

fn default_turn_key() -> String {
    "checkin-turn-timer".to_string()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            turn_key: default_turn_key(),
        }
    }
}

/// Turn extension configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Extensions allowed per session
    #[serde(default = "default_max_extensions")]
    pub max_extensions: u32,

    /// Seconds added by one extension
    #[serde(default = "default_extension_seconds")]
    pub extension_seconds: u64,
}

fn default_max_extensions() -> u32 {
    2
}

fn default_extension_seconds() -> u64 {
    60
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_extensions: default_max_extensions(),
            extension_seconds: default_extension_seconds(),
        }
    }
}

impl TurnConfig {
    pub fn clock_options(&self) -> TurnClockOptions {
        TurnClockOptions {
            max_extensions: self.max_extensions,
            extension_seconds: self.extension_seconds,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDERR only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::Config` if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CheckInError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CheckInError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(path) = std::env::var("CHECKIN_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(couple_id) = std::env::var("CHECKIN_COUPLE_ID") {
            self.workspace.couple_id = couple_id;
        }

        if let Ok(user_id) = std::env::var("CHECKIN_USER_ID") {
            self.workspace.user_id = user_id;
        }

        if let Ok(max) = std::env::var("CHECKIN_MAX_EXTENSIONS") {
            if let Ok(value) = max.parse() {
                self.turn.max_extensions = value;
            } else {
                tracing::warn!("Invalid CHECKIN_MAX_EXTENSIONS: {}", max);
            }
        }

        if let Ok(secs) = std::env::var("CHECKIN_EXTENSION_SECONDS") {
            if let Ok(value) = secs.parse() {
                self.turn.extension_seconds = value;
            } else {
                tracing::warn!("Invalid CHECKIN_EXTENSION_SECONDS: {}", secs);
            }
        }

        if let Ok(level) = std::env::var("CHECKIN_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("CHECKIN_JSON_LOGS") {
            match json.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid CHECKIN_JSON_LOGS: {}", json),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
        if let Some(couple_id) = &cli.couple {
            self.workspace.couple_id = couple_id.clone();
        }
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::Config` describing the first failed check.
    pub fn validate(&self) -> Result<()> {
        if self.workspace.couple_id.trim().is_empty() {
            return Err(
                CheckInError::Config("workspace.couple_id cannot be empty".to_string()).into(),
            );
        }

        if self.workspace.user_id.trim().is_empty() {
            return Err(
                CheckInError::Config("workspace.user_id cannot be empty".to_string()).into(),
            );
        }

        if self.timer.session_key.is_empty() || self.timer.turn_key.is_empty() {
            return Err(CheckInError::Config("timer keys cannot be empty".to_string()).into());
        }

        if self.timer.session_key == self.timer.turn_key {
            return Err(CheckInError::Config(
                "timer.session_key and timer.turn_key must differ".to_string(),
            )
            .into());
        }

        if self.turn.extension_seconds == 0 {
            return Err(CheckInError::Config(
                "turn.extension_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.turn.max_extensions > 10 {
            return Err(CheckInError::Config(
                "turn.max_extensions must be less than or equal to 10".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::test_utils::assert_error_contains;
    use serial_test::serial;

    fn cli() -> Cli {
        Cli {
            config: None,
            verbose: false,
            storage_path: None,
            couple: None,
            command: Commands::Status,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.workspace.couple_id, "local-couple");
        assert_eq!(config.timer.session_key, "checkin-session-timer");
        assert_eq!(config.turn.max_extensions, 2);
        assert_eq!(config.turn.extension_seconds, 60);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
workspace:
  couple_id: alex-and-sam
timer:
  turn_key: custom-turn
turn:
  max_extensions: 3
logging:
  json_format: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workspace.couple_id, "alex-and-sam");
        assert_eq!(config.workspace.user_id, "local-user");
        assert_eq!(config.timer.session_key, "checkin-session-timer");
        assert_eq!(config.timer.turn_key, "custom-turn");
        assert_eq!(config.turn.max_extensions, 3);
        assert_eq!(config.turn.extension_seconds, 60);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_validation_rejects_shared_timer_keys() {
        let mut config = Config::default();
        config.timer.turn_key = config.timer.session_key.clone();
        let err = config.validate().unwrap_err();
        assert_error_contains(&err, "must differ");
    }

    #[test]
    fn test_validation_rejects_empty_couple() {
        let mut config = Config::default();
        config.workspace.couple_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_extension() {
        let mut config = Config::default();
        config.turn.extension_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_too_many_extensions() {
        let mut config = Config::default();
        config.turn.max_extensions = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &cli()).unwrap();
        assert_eq!(config.turn.max_extensions, 2);
    }

    #[test]
    #[serial]
    fn test_load_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "turn: [not, a, map]").unwrap();

        let err = Config::load(path.to_str().unwrap(), &cli()).unwrap_err();
        assert_error_contains(&err, "Failed to parse config");
    }

    #[test]
    #[serial]
    fn test_env_vars_override_file_values() {
        std::env::set_var("CHECKIN_COUPLE_ID", "env-couple");
        std::env::set_var("CHECKIN_MAX_EXTENSIONS", "4");
        std::env::set_var("CHECKIN_EXTENSION_SECONDS", "not-a-number");
        std::env::set_var("CHECKIN_JSON_LOGS", "true");

        let config = Config::load("nonexistent.yaml", &cli()).unwrap();

        std::env::remove_var("CHECKIN_COUPLE_ID");
        std::env::remove_var("CHECKIN_MAX_EXTENSIONS");
        std::env::remove_var("CHECKIN_EXTENSION_SECONDS");
        std::env::remove_var("CHECKIN_JSON_LOGS");

        assert_eq!(config.workspace.couple_id, "env-couple");
        assert_eq!(config.turn.max_extensions, 4);
        assert_eq!(config.turn.extension_seconds, 60);
        assert!(config.logging.json_format);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        std::env::set_var("CHECKIN_COUPLE_ID", "env-couple");
        let mut cli = cli();
        cli.couple = Some("cli-couple".to_string());
        cli.storage_path = Some(PathBuf::from("/tmp/checkin-test.db"));
        cli.verbose = true;

        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        std::env::remove_var("CHECKIN_COUPLE_ID");

        assert_eq!(config.workspace.couple_id, "cli-couple");
        assert_eq!(
            config.storage.path,
            Some(PathBuf::from("/tmp/checkin-test.db"))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_turn_config_maps_to_clock_options() {
        let options = TurnConfig::default().clock_options();
        assert_eq!(options, TurnClockOptions::default());
    }
}
