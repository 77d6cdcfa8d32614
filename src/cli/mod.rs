//! CLI module for the productivity timers.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for daemon communication
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod display;

pub use client::{IpcClient, WatchSession};
pub use commands::{Cli, Commands, CreateArgs, DaemonArgs, EditArgs};
pub use display::Display;
