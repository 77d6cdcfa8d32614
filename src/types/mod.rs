//! Core data types for the productivity timers.
//!
//! This module defines the data structures used for:
//! - Timer configuration records with validation
//! - The pomodoro countdown state machine
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

/// Maximum length of a timer name in characters.
pub const MAX_NAME_LENGTH: usize = 100;

// ============================================================================
// TimerPhase
// ============================================================================

/// Represents the current phase of a countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Countdown is stopped (fresh, reset or paused)
    #[default]
    Idle,
    /// Focus interval is running
    Working,
    /// Break interval is running
    OnBreak,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Working => "working",
            TimerPhase::OnBreak => "on_break",
        }
    }

    /// Returns true if a countdown is running in this phase.
    pub fn is_active(&self) -> bool {
        matches!(self, TimerPhase::Working | TimerPhase::OnBreak)
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// A named timer configuration, as kept by the timer store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Store-assigned identifier (`None` before creation)
    #[serde(default)]
    pub id: Option<u32>,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Work interval in seconds
    pub timer_length: u32,
    /// Break interval in seconds
    pub break_length: u32,
}

impl TimerConfig {
    /// Creates a configuration that has not been stored yet.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        timer_length: u32,
        break_length: u32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            timer_length,
            break_length,
        }
    }

    /// Returns the configuration with the given id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("タイマー名は空にできません".to_string());
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!(
                "タイマー名は{}文字以内にしてください",
                MAX_NAME_LENGTH
            ));
        }
        if self.timer_length == 0 {
            return Err("作業時間は1秒以上を指定してください".to_string());
        }
        if self.break_length == 0 {
            return Err("休憩時間は1秒以上を指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The pomodoro countdown state machine.
///
/// Holds no clock of its own: the owner calls [`TimerState::tick`] once per
/// second while the phase is active. Every mutating method returns the value
/// that should be published to subscribers, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    /// Current phase
    pub phase: TimerPhase,
    /// Phase to resume into after an explicit pause
    pub pending_phase: TimerPhase,
    /// Remaining seconds in the current interval
    pub remaining_seconds: u32,
    work_seconds: u32,
    break_seconds: u32,
}

impl TimerState {
    /// Creates an idle state holding a full work interval. Durations must be
    /// positive.
    pub fn new(work_seconds: u32, break_seconds: u32) -> Self {
        Self {
            phase: TimerPhase::Idle,
            pending_phase: TimerPhase::Idle,
            remaining_seconds: work_seconds,
            work_seconds,
            break_seconds,
        }
    }

    /// Work interval in seconds.
    pub fn work_seconds(&self) -> u32 {
        self.work_seconds
    }

    /// Break interval in seconds.
    pub fn break_seconds(&self) -> u32 {
        self.break_seconds
    }

    /// Rewinds to a full work interval and goes idle.
    pub fn reset(&mut self) -> u32 {
        self.remaining_seconds = self.work_seconds;
        self.phase = TimerPhase::Idle;
        self.pending_phase = TimerPhase::Idle;
        self.remaining_seconds
    }

    /// Resets and begins a work interval.
    pub fn start(&mut self) -> u32 {
        let remaining = self.reset();
        self.phase = TimerPhase::Working;
        remaining
    }

    /// Suspends the running interval.
    ///
    /// Returns false, leaving the state untouched, if already idle.
    pub fn pause(&mut self) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        self.pending_phase = self.phase;
        self.phase = TimerPhase::Idle;
        true
    }

    /// Continues from where the countdown was paused.
    ///
    /// An idle state that was never paused resumes into a work interval
    /// holding the current remaining time (a full interval unless paused). Returns false, leaving the state
    /// untouched, if not idle.
    pub fn resume(&mut self) -> bool {
        if self.phase.is_active() {
            return false;
        }
        self.phase = match self.pending_phase {
            TimerPhase::Idle => TimerPhase::Working,
            pending => pending,
        };
        self.pending_phase = TimerPhase::Idle;
        true
    }

    /// Advances the countdown by one second.
    ///
    /// At zero the phase flips and the next interval's full length is
    /// returned instead of a decrement.
    pub fn tick(&mut self) -> u32 {
        if self.remaining_seconds == 0 {
            if self.phase == TimerPhase::Working {
                self.phase = TimerPhase::OnBreak;
                self.remaining_seconds = self.break_seconds;
            } else {
                self.phase = TimerPhase::Working;
                self.remaining_seconds = self.work_seconds;
            }
        } else {
            self.remaining_seconds -= 1;
        }
        self.remaining_seconds
    }
}

// ============================================================================
// TimerStatus
// ============================================================================

/// A timer configuration together with its live countdown state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    /// Stored configuration
    #[serde(flatten)]
    pub config: TimerConfig,
    /// Current phase
    pub phase: TimerPhase,
    /// Phase a paused countdown will resume into
    pub pending_phase: TimerPhase,
    /// Latest published remaining time (`None` before the first emission)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
}

impl TimerStatus {
    /// Returns true if the timer is idle because of an explicit pause.
    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Idle && self.pending_phase.is_active()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Fields for creating or updating a timer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerParams {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Work interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_length: Option<u32>,
    /// Break interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_length: Option<u32>,
}

impl TimerParams {
    /// Applies the present fields on top of an existing configuration.
    pub fn apply_to(&self, mut config: TimerConfig) -> TimerConfig {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        if let Some(timer_length) = self.timer_length {
            config.timer_length = timer_length;
        }
        if let Some(break_length) = self.break_length {
            config.break_length = break_length;
        }
        config
    }
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// List all timers
    List,
    /// Fetch one timer
    Get {
        /// Timer id
        id: u32,
    },
    /// Create a timer
    Create {
        /// New timer fields
        #[serde(flatten)]
        params: TimerParams,
    },
    /// Update a timer; absent fields keep their stored value
    Update {
        /// Timer id
        id: u32,
        /// Changed fields
        #[serde(flatten)]
        params: TimerParams,
    },
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
    /// Stream remaining time updates
    Watch {
        /// Timer id
        id: u32,
    },
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Single timer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerStatus>,
    /// Timer list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timers: Option<Vec<TimerStatus>>,
}

impl ResponseData {
    /// Wraps a single timer.
    pub fn timer(status: TimerStatus) -> Self {
        Self {
            timer: Some(status),
            timers: None,
        }
    }

    /// Wraps a timer list.
    pub fn timers(statuses: Vec<TimerStatus>) -> Self {
        Self {
            timer: None,
            timers: Some(statuses),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for error responses.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

/// One line of a `watch` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchFrame {
    /// Remaining seconds
    pub remaining_seconds: u32,
    /// Phase at the time of the emission
    pub phase: TimerPhase,
}

// ============================================================================
// Tests
// ============================================================================
