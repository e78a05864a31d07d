//! On-disk table cache.
//!
//! One file per signature, named `blake3(signature_name) || build_hash`
//! in hex. File layout, little-endian:
//!
//! ```text
//! magic "JTAB" (4) | version u16 | build_hash 32B
//! | signature_hash u64 | entry_count u32 | binary dispatch table
//! ```
//!
//! Stale or unreadable entries are treated as misses: the caller falls
//! back to regeneration, never to an error. Hard I/O failures (permission,
//! disk) do surface as errors.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use jade_dispatch::binary;
use jade_dispatch::DispatchTable;
use thiserror::Error;

use crate::hash::signature_name_hex;
use crate::BuildHash;

/// Cache file magic.
pub const CACHE_MAGIC: [u8; 4] = *b"JTAB";

/// Cache format version.
pub const CACHE_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 32 + 8 + 4;

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Root directory for cache storage.
    pub cache_dir: PathBuf,
    /// Core version, written to a version file; a mismatch invalidates
    /// the whole cache directory.
    pub core_version: String,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        CacheConfig {
            cache_dir: cache_dir.into(),
            core_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.core_version = version.into();
        self
    }
}

/// Cache failure.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed at {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Per-signature dispatch table cache.
#[derive(Debug)]
pub struct TableCache {
    config: CacheConfig,
    tables_dir: PathBuf,
}

impl TableCache {
    /// Open (and if needed create) the cache directory.
    ///
    /// A version file from another core version clears the directory.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let tables_dir = config.cache_dir.join("tables");

        let version_file = config.cache_dir.join("version");
        if let Ok(existing) = fs::read_to_string(&version_file) {
            if existing != config.core_version && tables_dir.exists() {
                tracing::warn!(
                    cached = existing.as_str(),
                    current = config.core_version.as_str(),
                    "cache version mismatch; clearing"
                );
                fs::remove_dir_all(&tables_dir).map_err(|e| CacheError::Io {
                    path: tables_dir.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        fs::create_dir_all(&tables_dir).map_err(|e| CacheError::Io {
            path: tables_dir.clone(),
            message: e.to_string(),
        })?;
        fs::write(&version_file, &config.core_version).map_err(|e| CacheError::Io {
            path: version_file,
            message: e.to_string(),
        })?;

        Ok(TableCache { config, tables_dir })
    }

    /// The file a `(signature, build hash)` pair is stored at.
    pub fn entry_path(&self, signature_name: &str, build_hash: BuildHash) -> PathBuf {
        let file_name = format!(
            "{}{}.jtab",
            signature_name_hex(signature_name),
            build_hash.to_hex()
        );
        self.tables_dir.join(file_name)
    }

    /// Whether an up-to-date entry exists.
    pub fn has(&self, signature_name: &str, build_hash: BuildHash) -> bool {
        self.entry_path(signature_name, build_hash).exists()
    }

    /// Store a generated table.
    ///
    /// Writes to a sibling temp file and renames, so concurrent readers
    /// never see a half-written entry.
    pub fn store(
        &self,
        signature_name: &str,
        build_hash: BuildHash,
        table: &DispatchTable,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(signature_name, build_hash);
        let body = binary::encode_table(table);

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&CACHE_MAGIC);
        bytes.extend_from_slice(&CACHE_VERSION.to_le_bytes());
        bytes.extend_from_slice(build_hash.as_bytes());
        bytes.extend_from_slice(&table.signature_hash.to_le_bytes());
        let entry_count = u32::try_from(table.exact_matches.len()).unwrap_or(u32::MAX);
        bytes.extend_from_slice(&entry_count.to_le_bytes());
        bytes.extend_from_slice(&body);

        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        file.write_all(&bytes).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        fs::rename(&tmp, &path).map_err(|e| CacheError::Io {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load a cached table.
    ///
    /// Returns `Ok(None)` on any miss: absent file, wrong magic or
    /// version, build-hash mismatch, or an undecodable body. The caller
    /// regenerates.
    pub fn load(
        &self,
        signature_name: &str,
        build_hash: BuildHash,
    ) -> Result<Option<DispatchTable>, CacheError> {
        let path = self.entry_path(signature_name, build_hash);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(_) => return Ok(None),
        };

        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_err() {
            return Ok(None);
        }
        if bytes.len() < HEADER_LEN {
            tracing::warn!(path = %path.display(), "cache entry truncated; regenerating");
            return Ok(None);
        }

        if bytes[0..4] != CACHE_MAGIC {
            tracing::warn!(path = %path.display(), "cache entry has bad magic; regenerating");
            return Ok(None);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != CACHE_VERSION {
            return Ok(None);
        }
        if &bytes[6..38] != build_hash.as_bytes() {
            tracing::warn!(path = %path.display(), "cache entry is stale; regenerating");
            return Ok(None);
        }

        match binary::decode_table(&bytes[HEADER_LEN..]) {
            Ok(table) => Ok(Some(table)),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "cache body undecodable; regenerating");
                Ok(None)
            }
        }
    }

    /// The cache root directory.
    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jade_resolve::ImplId;
    use jade_dispatch::ExactEntry;
    use pretty_assertions::assert_eq;

    fn build_hash(fill: u8) -> BuildHash {
        BuildHash::from_bytes([fill; 32])
    }

    fn sample_table() -> DispatchTable {
        let mut table = DispatchTable::empty(0xfeed);
        table.exact_matches = vec![
            ExactEntry {
                arg_hash: 10,
                implementation: ImplId::from_raw(0),
            },
            ExactEntry {
                arg_hash: 20,
                implementation: ImplId::from_raw(1),
            },
        ];
        table.refresh_metadata();
        table
    }

    fn cache(dir: &Path) -> TableCache {
        TableCache::new(CacheConfig::new(dir)).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let cache = cache(dir.path());
        let table = sample_table();

        cache
            .store("speak", build_hash(1), &table)
            .unwrap_or_else(|e| panic!("{e}"));
        let loaded = cache
            .load("speak", build_hash(1))
            .unwrap_or_else(|e| panic!("{e}"))
            .unwrap_or_else(|| panic!("entry must exist"));

        assert_eq!(loaded.signature_hash, table.signature_hash);
        assert_eq!(loaded.exact_matches, table.exact_matches);
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let cache = cache(dir.path());
        let result = cache
            .load("ghost", build_hash(1))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(result.is_none());
    }

    #[test]
    fn stale_build_hash_is_a_miss() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let cache = cache(dir.path());
        cache
            .store("speak", build_hash(1), &sample_table())
            .unwrap_or_else(|e| panic!("{e}"));

        // A different build hash names a different file.
        let result = cache
            .load("speak", build_hash(2))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(result.is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let cache = cache(dir.path());
        let path = cache.entry_path("speak", build_hash(1));
        fs::write(&path, b"JTABgarbage").unwrap_or_else(|e| panic!("{e}"));

        let result = cache
            .load("speak", build_hash(1))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(result.is_none());
    }

    #[test]
    fn version_mismatch_clears_cache() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        {
            let cache =
                TableCache::new(CacheConfig::new(dir.path()).with_version("0.1.0-old"))
                    .unwrap_or_else(|e| panic!("{e}"));
            cache
                .store("speak", build_hash(1), &sample_table())
                .unwrap_or_else(|e| panic!("{e}"));
        }

        let cache = TableCache::new(CacheConfig::new(dir.path()).with_version("0.2.0-new"))
            .unwrap_or_else(|e| panic!("{e}"));
        let result = cache
            .load("speak", build_hash(1))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(result.is_none());
    }

    #[test]
    fn file_name_is_blake3_concat_build_hash() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let cache = cache(dir.path());
        let path = cache.entry_path("speak", build_hash(0xcd));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_else(|| panic!("file name"));

        // 64 hex chars of blake3(name), 64 of the build hash.
        assert_eq!(name.len(), 64 + 64 + ".jtab".len());
        assert!(name.ends_with(&format!("{}.jtab", BuildHash::from_bytes([0xcd; 32]).to_hex())));
    }
}
