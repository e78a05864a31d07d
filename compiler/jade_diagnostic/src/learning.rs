//! Persisted fix-learning store.
//!
//! An append-only log of fix outcomes. The diagnostic layer consumes
//! per-(error pattern, fix pattern) acceptance rates to adjust suggestion
//! confidences across compilations. The store is read-only during a
//! compilation; recorded events are flushed atomically between
//! compilations.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recorded fix outcome.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FixEvent {
    /// Error pattern key, e.g. an error code.
    pub error_pattern: String,
    /// Fix identifier, e.g. `"qualify-call"`.
    pub fix_pattern: String,
    /// Whether the user accepted the fix.
    pub accepted: bool,
    /// Whether it was applied verbatim (no user edits).
    pub verbatim: bool,
    /// Seconds since the epoch, supplied by the caller.
    pub timestamp: u64,
}

/// Store failure.
#[derive(Debug, Error)]
pub enum LearningError {
    #[error("failed to read learning store {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to write learning store {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("learning store {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

#[derive(Copy, Clone, Debug, Default)]
struct Aggregate {
    accepted: u64,
    rejected: u64,
}

/// Append-only log plus in-memory acceptance aggregates.
#[derive(Debug, Default)]
pub struct FixLearningStore {
    events: Vec<FixEvent>,
    /// Events recorded this compilation, not yet flushed.
    pending: Vec<FixEvent>,
    aggregates: FxHashMap<(String, String), Aggregate>,
}

impl FixLearningStore {
    /// An empty store (no history).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the log from disk. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, LearningError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(path).map_err(|e| LearningError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let events: Vec<FixEvent> =
            bincode::deserialize(&bytes).map_err(|e| LearningError::Corrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut store = Self::new();
        for event in events {
            store.absorb(&event);
            store.events.push(event);
        }
        Ok(store)
    }

    /// Record an outcome. Aggregates see it immediately; the log entry is
    /// held until [`flush`](Self::flush).
    pub fn record(&mut self, event: FixEvent) {
        self.absorb(&event);
        self.pending.push(event);
    }

    /// Append pending events and persist the full log atomically (write to
    /// a sibling temp file, then rename).
    pub fn flush(&mut self, path: &Path) -> Result<(), LearningError> {
        self.events.append(&mut self.pending);
        let bytes = bincode::serialize(&self.events).map_err(|e| LearningError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| LearningError::Write {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        fs::rename(&tmp, path).map_err(|e| LearningError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Acceptance rate for a `(error pattern, fix pattern)` pair, if any
    /// history exists.
    pub fn acceptance_rate(&self, error_pattern: &str, fix_pattern: &str) -> Option<f64> {
        let aggregate = self
            .aggregates
            .get(&(error_pattern.to_string(), fix_pattern.to_string()))?;
        let total = aggregate.accepted + aggregate.rejected;
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = aggregate.accepted as f64 / total as f64;
        Some(rate)
    }

    /// Number of events in the log (excluding pending).
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn absorb(&mut self, event: &FixEvent) {
        let aggregate = self
            .aggregates
            .entry((event.error_pattern.clone(), event.fix_pattern.clone()))
            .or_default();
        if event.accepted {
            aggregate.accepted += 1;
        } else {
            aggregate.rejected += 1;
        }
    }
}
