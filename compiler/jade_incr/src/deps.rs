//! Dependency tracking between source files and signatures.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::CacheError;

/// Which signatures must be regenerated and which may load from cache.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebuildPlan {
    pub regenerate: BTreeSet<String>,
    pub from_cache: BTreeSet<String>,
}

/// Records `source file ↔ signature` edges.
///
/// Both directions are indexed; sets are ordered so plans and snapshots
/// are deterministic.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DependencyTracker {
    by_file: FxHashMap<PathBuf, BTreeSet<String>>,
    by_signature: FxHashMap<String, BTreeSet<PathBuf>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `signature` depends on `file`.
    pub fn record(&mut self, file: impl Into<PathBuf>, signature: impl Into<String>) {
        let file = file.into();
        let signature = signature.into();
        self.by_file
            .entry(file.clone())
            .or_default()
            .insert(signature.clone());
        self.by_signature.entry(signature).or_default().insert(file);
    }

    /// The files contributing to a signature, sorted.
    pub fn files_of(&self, signature: &str) -> Vec<PathBuf> {
        self.by_signature
            .get(signature)
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Signatures touching any of the changed files.
    pub fn invalidated_by<'a>(
        &self,
        changed: impl IntoIterator<Item = &'a Path>,
    ) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for file in changed {
            if let Some(signatures) = self.by_file.get(file) {
                out.extend(signatures.iter().cloned());
            }
        }
        out
    }

    /// Split all tracked signatures into regenerate/from-cache sets.
    pub fn plan<'a>(&self, changed: impl IntoIterator<Item = &'a Path>) -> RebuildPlan {
        let regenerate = self.invalidated_by(changed);
        let from_cache = self
            .by_signature
            .keys()
            .filter(|signature| !regenerate.contains(*signature))
            .cloned()
            .collect();
        RebuildPlan {
            regenerate,
            from_cache,
        }
    }

    /// Number of tracked signatures.
    pub fn len(&self) -> usize {
        self.by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }

    /// Persist the edge set next to the table cache.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let bytes = bincode::serialize(self).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, bytes).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a snapshot; a missing file yields an empty tracker.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match bincode::deserialize(&bytes) {
            Ok(tracker) => Ok(tracker),
            Err(error) => {
                // A corrupt snapshot costs a full rebuild, nothing more.
                tracing::warn!(%error, "dependency snapshot corrupt; starting empty");
                Ok(Self::new())
            }
        }
    }
}
