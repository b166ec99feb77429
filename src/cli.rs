//! Command-line interface definition
//!
//! This module defines the CLI structure using clap's derive API. Every
//! command acts as the configured couple and user against the local store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::checkin::Step;
use crate::timer::Partner;

/// checkin - guided relationship check-ins from the terminal
///
/// Walks a couple through a fixed sequence of conversation steps, with a
/// session timer and an optional turn-based speaking clock.
#[derive(Parser, Debug, Clone)]
#[command(name = "checkin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the storage directory
    #[arg(long)]
    pub storage_path: Option<PathBuf>,

    /// Act as this couple instead of the configured one
    #[arg(long)]
    pub couple: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a new check-in
    Start {
        /// Categories to discuss
        #[arg(required = true)]
        categories: Vec<String>,

        /// Mood before the check-in (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        mood: Option<u8>,
    },

    /// Show the active check-in
    Status,

    /// Move through the step sequence
    Step {
        #[command(subcommand)]
        command: StepCommand,
    },

    /// Manage notes on the active check-in
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },

    /// Save notes, category progress and step position
    Save,

    /// Finish the active check-in
    Complete {
        /// Mood after the check-in (1-5)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        mood: Option<u8>,

        /// Closing reflection
        #[arg(long)]
        reflection: Option<String>,
    },

    /// Abandon the active check-in and discard its notes
    Abandon,

    /// Control the session timer
    Timer {
        #[command(subcommand)]
        command: TimerCommand,
    },

    /// Control the turn-based speaking clock
    Turn {
        #[command(subcommand)]
        command: TurnCommand,
    },

    /// Inspect and choose session settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Step subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StepCommand {
    /// Mark a step completed (the current step by default)
    Complete {
        /// Step to complete, e.g. `welcome` or `category-selection`
        step: Option<Step>,
    },

    /// Go to a step that is current, completed, or next
    Goto {
        /// Target step
        step: Step,
    },
}

/// Note subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum NoteCommand {
    /// Add a note and save it
    Add {
        /// Note text
        content: String,

        /// Category the note belongs to
        #[arg(long)]
        category: Option<String>,
    },

    /// Remove a note by id
    Remove {
        /// Note id
        id: String,
    },
}

/// Session timer subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TimerCommand {
    /// Start from the full session duration
    Start,
    /// Pause a running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Stop and clear the timer
    Reset,
    /// Show remaining time
    Status,
    /// Count down in the terminal until time is up
    Watch,
}

/// Turn clock subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TurnCommand {
    /// Start the current partner's turn
    Start,
    /// Hand the floor to the other partner
    Switch,
    /// Add one extension to the current turn
    Extend,
    /// Use one of a partner's timeouts
    Timeout {
        /// `a` or `b`
        partner: Partner,
    },
    /// Show whose turn it is and the time left
    Status,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// List the available templates
    List,
    /// Show the active settings
    Show,
    /// Make a template the couple's active settings
    Apply {
        /// Template name: quick, standard, deep-dive
        template: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_mood() {
        let cli = Cli::try_parse_from(["checkin", "start", "communication", "trust", "--mood", "4"])
            .unwrap();
        match cli.command {
            Commands::Start { categories, mood } => {
                assert_eq!(categories, vec!["communication", "trust"]);
                assert_eq!(mood, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_start_requires_categories() {
        assert!(Cli::try_parse_from(["checkin", "start"]).is_err());
    }

    #[test]
    fn test_mood_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["checkin", "start", "trust", "--mood", "9"]).is_err());
    }

    #[test]
    fn test_parse_step_goto() {
        let cli = Cli::try_parse_from(["checkin", "step", "goto", "category-selection"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Step {
                command: StepCommand::Goto {
                    step: Step::CategorySelection
                }
            }
        ));
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(Cli::try_parse_from(["checkin", "step", "goto", "dessert"]).is_err());
    }

    #[test]
    fn test_parse_turn_timeout_partner() {
        let cli = Cli::try_parse_from(["checkin", "turn", "timeout", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Turn {
                command: TurnCommand::Timeout {
                    partner: Partner::PartnerB
                }
            }
        ));
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "checkin",
            "--couple",
            "sam-and-alex",
            "--storage-path",
            "/tmp/x",
            "-v",
            "status",
        ])
        .unwrap();
        assert_eq!(cli.couple.as_deref(), Some("sam-and-alex"));
        assert_eq!(cli.storage_path, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
    }
}
