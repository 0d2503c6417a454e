//! Local state store implementations.
//!
//! The worksheet-cell store lives in `flightboard-clients` next to the
//! Sheets client it shares.

use crate::traits::StateStore;
use async_trait::async_trait;
use flightboard_core::StateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

// ============================================================================
// FILE STORE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedSlots {
    #[serde(default)]
    slots: BTreeMap<String, String>,
}

/// Slots persisted as pretty JSON in a local file.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }

    fn load(&self) -> Result<PersistedSlots, StateError> {
        if !self.path.exists() {
            return Ok(PersistedSlots::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if contents.trim().is_empty() {
            return Ok(PersistedSlots::default());
        }
        serde_json::from_str(&contents).map_err(|e| StateError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn save(&self, state: &PersistedSlots) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let contents = serde_json::to_string_pretty(state).map_err(|e| StateError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, contents).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.load()?.slots.get(key).cloned())
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StateError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load()?;
        state.slots.insert(key.to_string(), value.to_string());
        self.save(&state)?;
        tracing::debug!(path = %self.path.display(), key, "State slot written");
        Ok(())
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Process-local slots. Lost on restart, so only suitable for tests and
/// dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    slots: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one slot already set.
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            slots: Mutex::new(HashMap::from([(key.into(), value.into())])),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `write_slot` calls so far, including rewrites of the same value.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.slots
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
