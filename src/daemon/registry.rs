//! Timer registry: one countdown engine per stored configuration.
//!
//! Editing a timer rebuilds its engine, so an in-progress countdown is
//! discarded. Deleting a timer drops its engine, which cancels the tick task
//! and closes any open watch streams.

use std::collections::HashMap;

use crate::store::{StoreError, TimerStore};
use crate::types::{TimerConfig, TimerParams, TimerStatus};

use super::timer::{PomodoroTimer, TimerError, TimerWatch};

// ============================================================================
// RegistryError
// ============================================================================

/// Errors surfaced by the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Store failure (unknown id, invalid record, I/O)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Engine failure or usage diagnostic
    #[error(transparent)]
    Timer(#[from] TimerError),
}

impl RegistryError {
    /// Returns true for the non-fatal pause/resume usage errors.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Timer(e) if e.is_usage())
    }
}

// ============================================================================
// TimerRegistry
// ============================================================================

/// Owns the timer store and the engines built from it.
pub struct TimerRegistry {
    store: Box<dyn TimerStore>,
    engines: HashMap<u32, PomodoroTimer>,
}

impl TimerRegistry {
    /// Builds an idle, reset engine for every stored timer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed or a stored record has
    /// unusable durations.
    pub fn load(store: Box<dyn TimerStore>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            store,
            engines: HashMap::new(),
        };

        for config in registry.store.list()? {
            if let Some(id) = config.id {
                registry.install_engine(id, &config)?;
            }
        }

        tracing::info!(count = registry.engines.len(), "timers loaded");
        Ok(registry)
    }

    /// Returns every timer with its live state, ordered by id.
    pub fn list(&self) -> Result<Vec<TimerStatus>, RegistryError> {
        self.store
            .list()?
            .into_iter()
            .map(|config| self.status_of(config))
            .collect()
    }

    /// Returns one timer with its live state.
    pub fn get(&self, id: u32) -> Result<TimerStatus, RegistryError> {
        let config = self.store.get(id)?;
        self.status_of(config)
    }

    /// Stores a new timer and builds its engine.
    pub fn create(&mut self, params: &TimerParams) -> Result<TimerStatus, RegistryError> {
        let draft = params.apply_to(TimerConfig::new("", "", 0, 0));
        // Fail before touching the store so a bad record never lands there.
        let engine = PomodoroTimer::new(draft.timer_length, draft.break_length)?;
        let config = self.store.create(draft)?;
        let id = config.id.ok_or(StoreError::MissingId)?;

        engine.reset();
        self.engines.insert(id, engine);
        tracing::info!(id, name = %config.name, "timer created");
        self.status_of(config)
    }

    /// Applies the given fields to a stored timer and rebuilds its engine.
    pub fn update(&mut self, id: u32, params: &TimerParams) -> Result<TimerStatus, RegistryError> {
        let current = self.store.get(id)?;
        let edited = params.apply_to(current);
        let engine = PomodoroTimer::new(edited.timer_length, edited.break_length)?;
        let config = self.store.update(edited)?;

        engine.reset();
        self.engines.insert(id, engine);
        tracing::info!(id, "timer updated, countdown reset");
        self.status_of(config)
    }

    /// Deletes a timer and stops its countdown.
    pub fn delete(&mut self, id: u32) -> Result<(), RegistryError> {
        self.store.delete(id)?;
        self.engines.remove(&id);
        tracing::info!(id, "timer deleted");
        Ok(())
    }

    /// Starts a fresh work interval.
    pub fn start(&self, id: u32) -> Result<TimerStatus, RegistryError> {
        self.engine(id)?.start();
        self.get(id)
    }

    /// Pauses a running countdown.
    pub fn pause(&self, id: u32) -> Result<TimerStatus, RegistryError> {
        self.engine(id)?.pause()?;
        self.get(id)
    }

    /// Resumes a paused countdown.
    pub fn resume(&self, id: u32) -> Result<TimerStatus, RegistryError> {
        self.engine(id)?.resume()?;
        self.get(id)
    }

    /// Resets a countdown to a full, idle work interval.
    pub fn reset(&self, id: u32) -> Result<TimerStatus, RegistryError> {
        self.engine(id)?.reset();
        self.get(id)
    }

    /// Subscribes to a timer's remaining-time stream.
    pub fn subscribe(&self, id: u32) -> Result<TimerWatch, RegistryError> {
        Ok(self.engine(id)?.watch())
    }

    /// Returns the engine of a timer.
    pub fn engine(&self, id: u32) -> Result<&PomodoroTimer, RegistryError> {
        self.engines
            .get(&id)
            .ok_or(RegistryError::Store(StoreError::NotFound(id)))
    }

    fn install_engine(&mut self, id: u32, config: &TimerConfig) -> Result<(), RegistryError> {
        let engine = PomodoroTimer::new(config.timer_length, config.break_length)?;
        engine.reset();
        self.engines.insert(id, engine);
        Ok(())
    }

    fn status_of(&self, config: TimerConfig) -> Result<TimerStatus, RegistryError> {
        let id = config.id.ok_or(StoreError::MissingId)?;
        let snapshot = self.engine(id)?.snapshot();
        Ok(TimerStatus {
            config,
            phase: snapshot.phase,
            pending_phase: snapshot.pending_phase,
            remaining_seconds: snapshot.remaining_seconds,
        })
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("engines", &self.engines.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
