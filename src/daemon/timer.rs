//! Countdown engine for a single pomodoro timer.
//!
//! This module provides:
//! - The four control operations (start, pause, resume, reset)
//! - A cancellable one-second tick task driven by `tokio::time::interval`
//! - A replay-latest stream of remaining seconds on a `watch` channel

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::types::{TimerPhase, TimerState};

/// Period between two ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// TimerError
// ============================================================================

/// Errors reported by the countdown engine.
///
/// The usage errors leave the engine untouched and are safe to ignore.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// A duration was zero
    #[error("作業時間と休憩時間は1秒以上を指定してください (作業: {work}秒, 休憩: {brk}秒)")]
    InvalidDuration {
        /// Work interval in seconds
        work: u32,
        /// Break interval in seconds
        brk: u32,
    },

    /// Engine created outside a tokio runtime
    #[error("tokioランタイムの外ではタイマーを作成できません")]
    NoRuntime,

    /// `pause` while idle
    #[error("待機中のタイマーは一時停止できません")]
    CannotPauseIdle,

    /// `resume` while running
    #[error("動作中のタイマーは再開できません")]
    CannotResumeActive,
}

impl TimerError {
    /// Returns true for the non-fatal pause/resume usage errors.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::CannotPauseIdle | Self::CannotResumeActive)
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Point-in-time view of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Current phase
    pub phase: TimerPhase,
    /// Phase a paused countdown will resume into
    pub pending_phase: TimerPhase,
    /// Latest published remaining time
    pub remaining_seconds: Option<u32>,
    /// Work interval in seconds
    pub work_seconds: u32,
    /// Break interval in seconds
    pub break_seconds: u32,
    /// Whether a tick task is currently held
    pub ticking: bool,
    /// Open stream subscribers
    pub watchers: usize,
}

// ============================================================================
// PomodoroTimer
// ============================================================================

struct Ticker {
    generation: u64,
    task: JoinHandle<()>,
}

struct Core {
    state: TimerState,
    ticker: Option<Ticker>,
    next_generation: u64,
}

impl Core {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.task.abort();
        }
    }

    fn holds(&self, generation: u64) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| ticker.generation == generation)
    }
}

struct Shared {
    core: Mutex<Core>,
    remaining_tx: watch::Sender<Option<u32>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, remaining: u32) {
        self.remaining_tx.send_replace(Some(remaining));
    }

    fn publish_if_unset(&self, remaining: u32) {
        self.remaining_tx.send_if_modified(|value| {
            if value.is_some() {
                return false;
            }
            *value = Some(remaining);
            true
        });
    }
}

/// Pomodoro countdown engine.
///
/// Alternates work and break intervals forever once started. All operations
/// are synchronous; the countdown itself runs on a tokio task that exists
/// only while the phase is `Working` or `OnBreak`. Dropping the engine
/// cancels that task and closes the stream.
pub struct PomodoroTimer {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl PomodoroTimer {
    /// Creates an idle engine. Nothing is published until the first `reset`,
    /// `start` or `resume`.
    ///
    /// # Errors
    ///
    /// Returns an error if either duration is zero or if called outside a
    /// tokio runtime.
    pub fn new(work_seconds: u32, break_seconds: u32) -> Result<Self, TimerError> {
        if work_seconds == 0 || break_seconds == 0 {
            return Err(TimerError::InvalidDuration {
                work: work_seconds,
                brk: break_seconds,
            });
        }
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let (remaining_tx, _) = watch::channel(None);

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    state: TimerState::new(work_seconds, break_seconds),
                    ticker: None,
                    next_generation: 0,
                }),
                remaining_tx,
            }),
            runtime,
        })
    }

    /// Stops any countdown and rewinds to a full work interval.
    pub fn reset(&self) {
        let mut core = self.shared.lock();
        core.cancel_ticker();
        let remaining = core.state.reset();
        self.shared.publish(remaining);
        tracing::debug!(remaining, "timer reset");
    }

    /// Starts a fresh work interval, discarding any countdown in progress.
    pub fn start(&self) {
        let mut core = self.shared.lock();
        core.cancel_ticker();
        let remaining = core.state.start();
        self.shared.publish(remaining);
        self.spawn_ticker(&mut core);
        tracing::debug!(remaining, "timer started");
    }

    /// Pauses the running countdown.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::CannotPauseIdle`] if the timer is idle; the
    /// engine is left unchanged.
    pub fn pause(&self) -> Result<(), TimerError> {
        let mut core = self.shared.lock();
        if !core.state.pause() {
            tracing::info!("cannot pause an idle timer");
            return Err(TimerError::CannotPauseIdle);
        }
        core.cancel_ticker();
        tracing::debug!(
            pending = core.state.pending_phase.as_str(),
            remaining = core.state.remaining_seconds,
            "timer paused"
        );
        Ok(())
    }

    /// Resumes from the paused phase without touching the remaining time.
    ///
    /// On an engine that never published, this starts a full work interval
    /// and publishes it.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::CannotResumeActive`] if the timer is running;
    /// the engine is left unchanged.
    pub fn resume(&self) -> Result<(), TimerError> {
        let mut core = self.shared.lock();
        if !core.state.resume() {
            tracing::info!("cannot resume a non-idle timer");
            return Err(TimerError::CannotResumeActive);
        }
        self.shared.publish_if_unset(core.state.remaining_seconds);
        self.spawn_ticker(&mut core);
        tracing::debug!(
            phase = core.state.phase.as_str(),
            remaining = core.state.remaining_seconds,
            "timer resumed"
        );
        Ok(())
    }

    /// Subscribes to the remaining-seconds stream.
    ///
    /// The receiver starts out holding the latest published value.
    pub fn subscribe(&self) -> watch::Receiver<Option<u32>> {
        self.shared.remaining_tx.subscribe()
    }

    /// Returns a detached view that follows this engine until it is dropped.
    pub fn watch(&self) -> TimerWatch {
        TimerWatch {
            remaining: self.subscribe(),
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> TimerPhase {
        self.shared.lock().state.phase
    }

    /// Returns a point-in-time view of the engine.
    pub fn snapshot(&self) -> TimerSnapshot {
        let core = self.shared.lock();
        TimerSnapshot {
            phase: core.state.phase,
            pending_phase: core.state.pending_phase,
            remaining_seconds: *self.shared.remaining_tx.borrow(),
            work_seconds: core.state.work_seconds(),
            break_seconds: core.state.break_seconds(),
            ticking: core.ticker.is_some(),
            watchers: self.shared.remaining_tx.receiver_count(),
        }
    }

    fn spawn_ticker(&self, core: &mut Core) {
        let generation = core.next_generation;
        core.next_generation = core.next_generation.wrapping_add(1);

        // Anchor to the call, not to the task's first poll.
        let first_tick = Instant::now() + TICK_PERIOD;
        let shared = Arc::clone(&self.shared);
        let task = self.runtime.spawn(async move {
            let mut ticker = interval_at(first_tick, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let mut core = shared.lock();
                // A stale task may wake before its abort lands.
                if !core.holds(generation) {
                    break;
                }
                let remaining = core.state.tick();
                shared.publish(remaining);
                tracing::trace!(remaining, phase = core.state.phase.as_str(), "tick");
            }
        });

        core.ticker = Some(Ticker { generation, task });
    }
}

impl Drop for PomodoroTimer {
    fn drop(&mut self) {
        self.shared.lock().cancel_ticker();
    }
}

impl std::fmt::Debug for PomodoroTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PomodoroTimer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

// ============================================================================
// TimerWatch
// ============================================================================

/// Subscriber handle that does not keep its engine alive.
///
/// `changed` fails once the engine has been dropped.
pub struct TimerWatch {
    remaining: watch::Receiver<Option<u32>>,
    shared: Weak<Shared>,
}

impl TimerWatch {
    /// Latest published remaining time, marking it as seen.
    pub fn latest(&mut self) -> Option<u32> {
        *self.remaining.borrow_and_update()
    }

    /// Waits for the next emission.
    ///
    /// # Errors
    ///
    /// Returns an error once the engine is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.remaining.changed().await
    }

    /// Current phase, or `None` if the engine is gone.
    pub fn phase(&self) -> Option<TimerPhase> {
        self.shared.upgrade().map(|shared| shared.lock().state.phase)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Lets the tick task observe a clock change.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_ticks(count: u32) {
        for _ in 0..count {
            tokio::time::advance(TICK_PERIOD).await;
            settle().await;
        }
    }

    // ------------------------------------------------------------------------
    // Construction Tests
    // ------------------------------------------------------------------------

    mod construction_tests {
        use super::*;

        #[tokio::test]
        async fn test_new_is_idle_without_value() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            let snapshot = timer.snapshot();

            assert_eq!(snapshot.phase, TimerPhase::Idle);
            assert_eq!(snapshot.pending_phase, TimerPhase::Idle);
            assert_eq!(snapshot.remaining_seconds, None);
            assert!(!snapshot.ticking);
            assert_eq!(*timer.subscribe().borrow(), None);
        }

        #[tokio::test]
        async fn test_new_rejects_zero_durations() {
            assert_eq!(
                PomodoroTimer::new(0, 5).unwrap_err(),
                TimerError::InvalidDuration { work: 0, brk: 5 }
            );
            assert!(PomodoroTimer::new(5, 0).is_err());
        }

        #[test]
        fn test_new_outside_runtime() {
            assert_eq!(
                PomodoroTimer::new(10, 5).unwrap_err(),
                TimerError::NoRuntime
            );
        }

        #[test]
        fn test_usage_errors() {
            assert!(TimerError::CannotPauseIdle.is_usage());
            assert!(TimerError::CannotResumeActive.is_usage());
            assert!(!TimerError::NoRuntime.is_usage());
        }
    }

    // ------------------------------------------------------------------------
    // Control Operation Tests
    // ------------------------------------------------------------------------

    mod control_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_start_publishes_work_length() {
            let timer = PomodoroTimer::new(25, 5).unwrap();
            let mut rx = timer.subscribe();

            timer.start();

            assert!(rx.has_changed().unwrap());
            assert_eq!(*rx.borrow_and_update(), Some(25));
            assert_eq!(timer.phase(), TimerPhase::Working);
            assert!(timer.snapshot().ticking);
        }

        #[tokio::test(start_paused = true)]
        async fn test_reset_twice_matches_reset_once() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            advance_ticks(2).await;

            timer.reset();
            let once = timer.snapshot();
            timer.reset();

            assert_eq!(timer.snapshot(), once);
            assert_eq!(once.remaining_seconds, Some(10));
            assert_eq!(once.phase, TimerPhase::Idle);
            assert!(!once.ticking);
        }

        #[tokio::test(start_paused = true)]
        async fn test_pause_idle_is_noop() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.reset();
            let before = timer.snapshot();

            assert_eq!(timer.pause(), Err(TimerError::CannotPauseIdle));
            assert_eq!(timer.snapshot(), before);
        }

        #[tokio::test(start_paused = true)]
        async fn test_resume_running_is_noop() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            let before = timer.snapshot();

            assert_eq!(timer.resume(), Err(TimerError::CannotResumeActive));
            assert_eq!(timer.snapshot(), before);
        }

        #[tokio::test(start_paused = true)]
        async fn test_ticking_iff_active() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            assert!(!timer.snapshot().ticking);

            timer.start();
            assert!(timer.snapshot().ticking);

            timer.pause().unwrap();
            assert!(!timer.snapshot().ticking);
            assert_eq!(timer.snapshot().pending_phase, TimerPhase::Working);

            timer.resume().unwrap();
            assert!(timer.snapshot().ticking);

            timer.reset();
            assert!(!timer.snapshot().ticking);
        }
    }

    // ------------------------------------------------------------------------
    // Tick Loop Tests
    // ------------------------------------------------------------------------

    mod tick_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_two_by_one_emission_sequence() {
            let timer = PomodoroTimer::new(2, 1).unwrap();
            let mut rx = timer.subscribe();

            timer.start();
            let mut emitted = vec![rx.borrow_and_update().unwrap()];
            let mut phases = vec![timer.phase()];
            for _ in 0..5 {
                advance_ticks(1).await;
                assert!(rx.has_changed().unwrap());
                emitted.push(rx.borrow_and_update().unwrap());
                phases.push(timer.phase());
            }

            assert_eq!(emitted, vec![2, 1, 0, 1, 0, 1]);
            assert_eq!(
                phases,
                vec![
                    TimerPhase::Working,
                    TimerPhase::Working,
                    TimerPhase::Working,
                    TimerPhase::OnBreak,
                    TimerPhase::OnBreak,
                    TimerPhase::Working,
                ]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_emission_before_first_period() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            let mut rx = timer.subscribe();
            timer.start();
            rx.borrow_and_update();

            tokio::time::advance(Duration::from_millis(999)).await;
            settle().await;

            assert!(!rx.has_changed().unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_emission_while_paused() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            let mut rx = timer.subscribe();
            timer.start();
            advance_ticks(1).await;

            timer.pause().unwrap();
            rx.borrow_and_update();
            advance_ticks(5).await;

            assert!(!rx.has_changed().unwrap());
            assert_eq!(timer.snapshot().remaining_seconds, Some(9));
        }

        #[tokio::test(start_paused = true)]
        async fn test_resume_preserves_remaining_time() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            let mut rx = timer.subscribe();
            timer.start();
            advance_ticks(3).await;
            assert_eq!(*rx.borrow_and_update(), Some(7));

            timer.pause().unwrap();
            timer.resume().unwrap();
            advance_ticks(1).await;

            assert_eq!(*rx.borrow_and_update(), Some(6));
        }

        #[tokio::test(start_paused = true)]
        async fn test_resume_on_break_stays_on_break() {
            let timer = PomodoroTimer::new(1, 3).unwrap();
            timer.start();
            advance_ticks(2).await;
            assert_eq!(timer.phase(), TimerPhase::OnBreak);

            timer.pause().unwrap();
            assert_eq!(timer.snapshot().pending_phase, TimerPhase::OnBreak);

            timer.resume().unwrap();
            advance_ticks(1).await;
            assert_eq!(timer.phase(), TimerPhase::OnBreak);
            assert_eq!(timer.snapshot().remaining_seconds, Some(2));
        }

        #[tokio::test(start_paused = true)]
        async fn test_resume_after_construction_starts_work_interval() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            let mut rx = timer.subscribe();

            timer.resume().unwrap();
            assert_eq!(timer.phase(), TimerPhase::Working);
            assert_eq!(*rx.borrow_and_update(), Some(10));

            advance_ticks(1).await;
            assert_eq!(timer.phase(), TimerPhase::Working);
            assert_eq!(*rx.borrow_and_update(), Some(9));
        }

        #[tokio::test(start_paused = true)]
        async fn test_resume_after_reset_does_not_republish() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.reset();
            let mut rx = timer.subscribe();
            rx.borrow_and_update();

            timer.resume().unwrap();

            assert!(!rx.has_changed().unwrap());
            assert_eq!(timer.phase(), TimerPhase::Working);
        }

        #[tokio::test(start_paused = true)]
        async fn test_restart_keeps_single_ticker() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            advance_ticks(1).await;
            timer.start();
            timer.start();

            advance_ticks(1).await;

            assert_eq!(timer.snapshot().remaining_seconds, Some(9));
        }

        #[tokio::test(start_paused = true)]
        async fn test_late_subscriber_sees_latest_value() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            advance_ticks(4).await;

            let rx = timer.subscribe();
            assert_eq!(*rx.borrow(), Some(6));
        }
    }

    // ------------------------------------------------------------------------
    // TimerWatch Tests
    // ------------------------------------------------------------------------

    mod watch_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_watch_follows_engine() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            let mut watch = timer.watch();

            assert_eq!(watch.latest(), Some(10));
            assert_eq!(watch.phase(), Some(TimerPhase::Working));

            advance_ticks(1).await;
            watch.changed().await.unwrap();
            assert_eq!(watch.latest(), Some(9));
        }

        #[tokio::test(start_paused = true)]
        async fn test_watch_closes_when_engine_dropped() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            timer.start();
            let mut watch = timer.watch();
            watch.latest();

            drop(timer);
            settle().await;

            assert!(watch.changed().await.is_err());
            assert_eq!(watch.phase(), None);
        }

        #[tokio::test]
        async fn test_snapshot_counts_watchers() {
            let timer = PomodoroTimer::new(10, 5).unwrap();
            assert_eq!(timer.snapshot().watchers, 0);

            let watch = timer.watch();
            let rx = timer.subscribe();
            assert_eq!(timer.snapshot().watchers, 2);

            drop(watch);
            drop(rx);
            assert_eq!(timer.snapshot().watchers, 0);
        }
    }
}
