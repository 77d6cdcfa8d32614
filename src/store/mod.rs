//! Timer configuration store.
//!
//! This module provides:
//! - `TimerStore`: trait for listing, creating, editing and deleting timers
//! - `MemoryStore`: in-memory implementation
//! - `JsonFileStore`: `MemoryStore` persisted to a JSON file

mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::StoreError;

use crate::types::TimerConfig;

// ============================================================================
// TimerStore
// ============================================================================

/// Repository of timer configurations.
///
/// Ids are assigned by the store on `create` and never reused.
pub trait TimerStore: Send {
    /// Returns every timer ordered by id.
    fn list(&self) -> Result<Vec<TimerConfig>, StoreError>;

    /// Returns the timer with the given id.
    fn get(&self, id: u32) -> Result<TimerConfig, StoreError>;

    /// Stores a new timer, ignoring any id it carries.
    fn create(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError>;

    /// Replaces the stored fields of an existing timer.
    fn update(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError>;

    /// Removes a timer.
    fn delete(&mut self, id: u32) -> Result<(), StoreError>;
}

fn validate(config: &TimerConfig) -> Result<(), StoreError> {
    config.validate().map_err(StoreError::Invalid)
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory timer store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    timers: BTreeMap<u32, TimerConfig>,
    next_id: u32,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records as-is.
    ///
    /// Records without an id are assigned one after the highest existing id.
    pub fn with_timers(timers: impl IntoIterator<Item = TimerConfig>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        let mut pending = Vec::new();

        for config in timers {
            match config.id {
                Some(id) => {
                    store.next_id = store.next_id.max(id);
                    store.timers.insert(id, config);
                }
                None => pending.push(config),
            }
        }
        for config in pending {
            store.create(config)?;
        }
        Ok(store)
    }

    fn allocate_id(&mut self) -> Result<u32, StoreError> {
        let id = self.next_id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        self.next_id = id;
        Ok(id)
    }
}

impl TimerStore for MemoryStore {
    fn list(&self) -> Result<Vec<TimerConfig>, StoreError> {
        Ok(self.timers.values().cloned().collect())
    }

    fn get(&self, id: u32) -> Result<TimerConfig, StoreError> {
        self.timers.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn create(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError> {
        validate(&config)?;
        let id = self.allocate_id()?;
        let stored = config.with_id(id);
        self.timers.insert(id, stored.clone());
        tracing::debug!(id, name = %stored.name, "timer created");
        Ok(stored)
    }

    fn update(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError> {
        let id = config.id.ok_or(StoreError::MissingId)?;
        let slot = self.timers.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        validate(&config)?;
        *slot = config.clone();
        tracing::debug!(id, "timer updated");
        Ok(config)
    }

    fn delete(&mut self, id: u32) -> Result<(), StoreError> {
        self.timers.remove(&id).ok_or(StoreError::NotFound(id))?;
        tracing::debug!(id, "timer deleted");
        Ok(())
    }
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// Timer store persisted as a JSON array of records.
///
/// Each mutation is applied to a copy and the file rewritten from it. The
/// copy replaces the in-memory state only once the write succeeded, so a
/// failed write leaves both unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let timers: Vec<TimerConfig> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Format {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::info!(path = ?path, count = timers.len(), "timer store opened");
        let inner = MemoryStore::with_timers(timers)?;
        Ok(Self { path, inner })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut staged = self.inner.clone();
        let out = change(&mut staged)?;
        self.persist(&staged)?;
        self.inner = staged;
        Ok(out)
    }

    fn persist(&self, timers: &MemoryStore) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let timers = timers.list()?;
        let json = serde_json::to_vec_pretty(&timers).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl TimerStore for JsonFileStore {
    fn list(&self) -> Result<Vec<TimerConfig>, StoreError> {
        self.inner.list()
    }

    fn get(&self, id: u32) -> Result<TimerConfig, StoreError> {
        self.inner.get(id)
    }

    fn create(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError> {
        self.commit(|timers| timers.create(config))
    }

    fn update(&mut self, config: TimerConfig) -> Result<TimerConfig, StoreError> {
        self.commit(|timers| timers.update(config))
    }

    fn delete(&mut self, id: u32) -> Result<(), StoreError> {
        self.commit(|timers| timers.delete(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
