//! Command definitions for the productivity CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DATA_ENV, SOCKET_ENV};
use crate::types::{TimerParams, MAX_NAME_LENGTH};

// ============================================================================
// CLI Structure
// ============================================================================

/// Productivity CLI - manage and run pomodoro timers
#[derive(Parser, Debug)]
#[command(
    name = "productivity",
    version,
    about = "ポモドーロタイマー管理CLI",
    long_about = "名前付きのポモドーロタイマーを作成・編集・削除し、\n\
                  デーモン上でカウントダウンを実行します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon socket path
    #[arg(long, global = true, env = SOCKET_ENV, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List all timers
    List,

    /// Show one timer
    Show {
        /// Timer id
        id: u32,
    },

    /// Create a new timer
    Create(CreateArgs),

    /// Edit an existing timer (resets its countdown)
    Edit(EditArgs),

    /// Delete a timer
    Delete {
        /// Timer id
        id: u32,
    },

    /// Start a timer from a full work interval
    Start {
        /// Timer id
        id: u32,
    },

    /// Pause a running timer
    Pause {
        /// Timer id
        id: u32,
    },

    /// Resume a paused timer
    Resume {
        /// Timer id
        id: u32,
    },

    /// Reset a timer to idle
    Reset {
        /// Timer id
        id: u32,
    },

    /// Follow a timer's countdown
    Watch {
        /// Timer id
        id: u32,
    },

    /// Run as daemon (background service)
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the create command
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Timer name
    #[arg(short, long, value_parser = validate_timer_name)]
    pub name: String,

    /// Timer description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Work duration in seconds
    #[arg(
        short,
        long,
        default_value = "1500",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub work: u32,

    /// Break duration in seconds
    #[arg(
        short,
        long = "break",
        default_value = "300",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub break_time: u32,
}

impl From<&CreateArgs> for TimerParams {
    fn from(args: &CreateArgs) -> Self {
        Self {
            name: Some(args.name.clone()),
            description: Some(args.description.clone()),
            timer_length: Some(args.work),
            break_length: Some(args.break_time),
        }
    }
}

/// Arguments for the edit command; omitted fields keep their value
#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Timer id
    pub id: u32,

    /// New name
    #[arg(short, long, value_parser = validate_timer_name)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New work duration in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub work: Option<u32>,

    /// New break duration in seconds
    #[arg(short, long = "break", value_parser = clap::value_parser!(u32).range(1..))]
    pub break_time: Option<u32>,
}

impl From<&EditArgs> for TimerParams {
    fn from(args: &EditArgs) -> Self {
        Self {
            name: args.name.clone(),
            description: args.description.clone(),
            timer_length: args.work,
            break_length: args.break_time,
        }
    }
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Timer data file
    #[arg(long, env = DATA_ENV, value_name = "PATH")]
    pub data: Option<PathBuf>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the timer name.
///
/// - Must not be blank
/// - Must not exceed `MAX_NAME_LENGTH` characters
fn validate_timer_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("タイマー名は空にできません".to_string());
    }
    if s.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "タイマー名は{}文字以内にしてください",
            MAX_NAME_LENGTH
        ));
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["productivity"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["productivity", "-v", "list"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::List)));
        }

        #[test]
        fn test_parse_socket_flag() {
            let cli = Cli::parse_from(["productivity", "list", "--socket", "/tmp/p.sock"]);
            assert_eq!(cli.socket, Some(PathBuf::from("/tmp/p.sock")));
        }

        #[test]
        fn test_parse_control_commands() {
            let cli = Cli::parse_from(["productivity", "start", "3"]);
            assert!(matches!(cli.command, Some(Commands::Start { id: 3 })));

            let cli = Cli::parse_from(["productivity", "pause", "3"]);
            assert!(matches!(cli.command, Some(Commands::Pause { id: 3 })));

            let cli = Cli::parse_from(["productivity", "resume", "3"]);
            assert!(matches!(cli.command, Some(Commands::Resume { id: 3 })));

            let cli = Cli::parse_from(["productivity", "reset", "3"]);
            assert!(matches!(cli.command, Some(Commands::Reset { id: 3 })));

            let cli = Cli::parse_from(["productivity", "watch", "3"]);
            assert!(matches!(cli.command, Some(Commands::Watch { id: 3 })));
        }

        #[test]
        fn test_parse_show_and_delete() {
            let cli = Cli::parse_from(["productivity", "show", "1"]);
            assert!(matches!(cli.command, Some(Commands::Show { id: 1 })));

            let cli = Cli::parse_from(["productivity", "delete", "2"]);
            assert!(matches!(cli.command, Some(Commands::Delete { id: 2 })));
        }

        #[test]
        fn test_parse_daemon_data() {
            let cli = Cli::parse_from(["productivity", "daemon", "--data", "/tmp/t.json"]);
            match cli.command {
                Some(Commands::Daemon(args)) => {
                    assert_eq!(args.data, Some(PathBuf::from("/tmp/t.json")));
                }
                other => panic!("Expected Daemon command, got {:?}", other),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["productivity", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Create / Edit Argument Tests
    // ------------------------------------------------------------------------

    mod timer_args_tests {
        use super::*;

        #[test]
        fn test_parse_create_defaults() {
            let cli = Cli::parse_from(["productivity", "create", "--name", "Focus"]);
            match cli.command {
                Some(Commands::Create(args)) => {
                    assert_eq!(args.name, "Focus");
                    assert_eq!(args.description, "");
                    assert_eq!(args.work, 1500);
                    assert_eq!(args.break_time, 300);
                }
                _ => panic!("Expected Create command"),
            }
        }

        #[test]
        fn test_parse_create_all_options() {
            let cli = Cli::parse_from([
                "productivity",
                "create",
                "-n",
                "Deep work",
                "-d",
                "No meetings",
                "-w",
                "3000",
                "-b",
                "600",
            ]);
            match cli.command {
                Some(Commands::Create(args)) => {
                    let params = TimerParams::from(&args);
                    assert_eq!(params.name.as_deref(), Some("Deep work"));
                    assert_eq!(params.description.as_deref(), Some("No meetings"));
                    assert_eq!(params.timer_length, Some(3000));
                    assert_eq!(params.break_length, Some(600));
                }
                _ => panic!("Expected Create command"),
            }
        }

        #[test]
        fn test_parse_edit_partial() {
            let cli = Cli::parse_from(["productivity", "edit", "1", "--work", "1800"]);
            match cli.command {
                Some(Commands::Edit(args)) => {
                    assert_eq!(args.id, 1);
                    let params = TimerParams::from(&args);
                    assert_eq!(params.timer_length, Some(1800));
                    assert!(params.name.is_none());
                    assert!(params.break_length.is_none());
                }
                _ => panic!("Expected Edit command"),
            }
        }

        #[test]
        fn test_validate_timer_name() {
            assert_eq!(validate_timer_name("Focus").unwrap(), "Focus");
            assert!(validate_timer_name("タイマー").is_ok());
            assert!(validate_timer_name("").unwrap_err().contains("空"));
            assert!(validate_timer_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Error Case Tests (using try_parse)
    // ------------------------------------------------------------------------

    mod error_tests {
        use super::*;

        #[test]
        fn test_parse_create_requires_name() {
            assert!(Cli::try_parse_from(["productivity", "create"]).is_err());
        }

        #[test]
        fn test_parse_create_zero_work() {
            let result = Cli::try_parse_from(["productivity", "create", "-n", "a", "-w", "0"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_edit_zero_break() {
            let result = Cli::try_parse_from(["productivity", "edit", "1", "--break", "0"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_start_requires_id() {
            assert!(Cli::try_parse_from(["productivity", "start"]).is_err());
        }

        #[test]
        fn test_parse_start_non_numeric_id() {
            assert!(Cli::try_parse_from(["productivity", "start", "abc"]).is_err());
        }

        #[test]
        fn test_parse_unknown_command() {
            assert!(Cli::try_parse_from(["productivity", "unknown"]).is_err());
        }
    }
}
