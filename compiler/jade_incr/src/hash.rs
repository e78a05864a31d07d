//! Source file hashing for incremental builds.
//!
//! Quick change detection uses file metadata (size, mtime); accurate
//! detection uses a content hash. Per-file hashes fold into a 32-byte
//! build hash that keys the on-disk cache.

use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHasher};
use thiserror::Error;

/// 64-bit content hash of one source file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ContentHash(u64);

impl ContentHash {
    pub const fn new(value: u64) -> Self {
        ContentHash(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

/// 32-byte build hash over every source contributing to a signature.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BuildHash([u8; 32]);

impl BuildHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        BuildHash(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, for cache file names.
    pub fn to_hex(self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// Hashing failure (I/O only).
#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
}

#[derive(Debug, Clone)]
struct FileMetadata {
    size: u64,
    mtime: SystemTime,
    content_hash: ContentHash,
}

/// Hashes source files with a metadata-based quick path.
#[derive(Debug, Default)]
pub struct SourceHasher {
    cache: FxHashMap<PathBuf, FileMetadata>,
}

impl SourceHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash one file's content.
    ///
    /// If size and mtime are unchanged since the last call, the cached
    /// hash is returned without reading the file.
    pub fn hash_file(&mut self, path: &Path) -> Result<ContentHash, HashError> {
        if let Some(cached) = self.cache.get(path) {
            if let Ok(meta) = fs::metadata(path) {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                if cached.size == meta.len() && cached.mtime == mtime {
                    return Ok(cached.content_hash);
                }
            }
        }

        let bytes = fs::read(path).map_err(|e| HashError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut hasher = FxHasher::default();
        bytes.hash(&mut hasher);
        let content_hash = ContentHash(hasher.finish());

        if let Ok(meta) = fs::metadata(path) {
            self.cache.insert(
                path.to_path_buf(),
                FileMetadata {
                    size: meta.len(),
                    mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    content_hash,
                },
            );
        }

        Ok(content_hash)
    }

    /// Build hash over a set of contributing files.
    ///
    /// Paths are sorted before folding, so the hash is independent of
    /// traversal order.
    pub fn build_hash(&mut self, paths: &[PathBuf]) -> Result<BuildHash, HashError> {
        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut hasher = blake3::Hasher::new();
        for path in sorted {
            let content = self.hash_file(path)?;
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&content.value().to_le_bytes());
        }
        Ok(BuildHash(*hasher.finalize().as_bytes()))
    }
}

/// Blake3 of a signature name, for cache file naming.
pub(crate) fn signature_name_hex(signature_name: &str) -> String {
    let digest = blake3::hash(signature_name.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest.as_bytes() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn same_content_same_hash() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let a = dir.path().join("a.jade");
        let b = dir.path().join("b.jade");
        fs::write(&a, "fn f(x: int) -> int").unwrap_or_else(|e| panic!("{e}"));
        fs::write(&b, "fn f(x: int) -> int").unwrap_or_else(|e| panic!("{e}"));

        let mut hasher = SourceHasher::new();
        let hash_a = hasher.hash_file(&a).unwrap_or_else(|e| panic!("{e}"));
        let hash_b = hasher.hash_file(&b).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn changed_content_changes_hash() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("a.jade");
        fs::write(&path, "one").unwrap_or_else(|e| panic!("{e}"));

        let mut hasher = SourceHasher::new();
        let before = hasher.hash_file(&path).unwrap_or_else(|e| panic!("{e}"));
        fs::write(&path, "two").unwrap_or_else(|e| panic!("{e}"));
        let after = hasher.hash_file(&path).unwrap_or_else(|e| panic!("{e}"));
        assert_ne!(before, after);
    }

    #[test]
    fn build_hash_is_order_independent() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let a = dir.path().join("a.jade");
        let b = dir.path().join("b.jade");
        fs::write(&a, "alpha").unwrap_or_else(|e| panic!("{e}"));
        fs::write(&b, "beta").unwrap_or_else(|e| panic!("{e}"));

        let mut hasher = SourceHasher::new();
        let forward = hasher
            .build_hash(&[a.clone(), b.clone()])
            .unwrap_or_else(|e| panic!("{e}"));
        let backward = hasher.build_hash(&[b, a]).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(forward, backward);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut hasher = SourceHasher::new();
        assert!(hasher.hash_file(Path::new("/nonexistent/x.jade")).is_err());
    }

    #[test]
    fn hex_rendering_is_64_chars() {
        let hash = BuildHash::from_bytes([0xab; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("abab"));
    }
}
