use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::transport::TelemetryPayload;

/// One undelivered payload waiting for a transport to come back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: TelemetryPayload,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Durable mirror for the offline cache so it survives a process restart.
pub trait CacheStore: Send {
    fn load(&mut self) -> Result<Vec<CacheEntry>, CacheStoreError>;
    fn save(&mut self, entries: &[CacheEntry]) -> Result<(), CacheStoreError>;
}

/// Single-file JSON persistence. A missing file is an empty cache, not an
/// error.
pub struct JsonFileCacheStore {
    path: PathBuf,
}

impl JsonFileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStore for JsonFileCacheStore {
    fn load(&mut self) -> Result<Vec<CacheEntry>, CacheStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&mut self, entries: &[CacheEntry]) -> Result<(), CacheStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

/// FIFO buffer of undelivered payloads, bounded at `max_entries`.
/// Overflow silently evicts the oldest entries but counts them, so tests
/// and diagnostics can observe capacity pressure.
pub struct OfflineCache {
    entries: VecDeque<CacheEntry>,
    max_entries: usize,
    evictions: u64,
}

impl OfflineCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            evictions: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    pub fn push(&mut self, entry: CacheEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
            self.evictions += 1;
        }
    }

    /// Takes everything out for a batch flush attempt.
    pub fn drain_all(&mut self) -> Vec<CacheEntry> {
        self.entries.drain(..).collect()
    }

    /// Puts a failed batch back ahead of anything cached since the drain,
    /// preserving the original order. No data is lost on flush failure.
    pub fn restore_front(&mut self, batch: Vec<CacheEntry>) {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
            self.evictions += 1;
        }
    }

    pub fn replace_all(&mut self, entries: Vec<CacheEntry>) {
        self.entries = entries.into();
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
            self.evictions += 1;
        }
    }

    /// Mirrors the current contents to the durable store. Persistence
    /// failures degrade to a warning; the in-memory cache stays intact.
    pub fn mirror_to<S: CacheStore>(&self, store: &mut S) {
        let snapshot: Vec<CacheEntry> = self.entries.iter().cloned().collect();
        if let Err(err) = store.save(&snapshot) {
            warn!(error = %err, "failed to mirror offline cache to durable store");
        }
    }
}
