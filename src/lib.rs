//! Productivity Timers Library
//!
//! This library provides the core functionality for the productivity CLI.
//! It includes:
//! - Countdown engine with the work/break state machine
//! - Timer store (in-memory and JSON file backed)
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Type definitions for timer records and state

pub mod cli;
pub mod config;
pub mod daemon;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{PomodoroTimer, TimerError, TimerRegistry, TimerSnapshot, TimerWatch};
pub use store::{JsonFileStore, MemoryStore, StoreError, TimerStore};
pub use types::{
    IpcRequest, IpcResponse, ResponseData, TimerConfig, TimerParams, TimerPhase, TimerState,
    TimerStatus, WatchFrame,
};
