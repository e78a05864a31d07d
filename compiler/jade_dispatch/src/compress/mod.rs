//! Semantic table compression.
//!
//! Three formats over the exact layer, all varint-based and lossless:
//!
//! - **Delta**: hash deltas (the layer is sorted, so deltas are small)
//!   with inline implementation indices.
//! - **Pattern**: run-length over repeated implementation indices, hash
//!   deltas inside each run.
//! - **Dictionary**: distinct implementation indices in a dictionary,
//!   entries carry dictionary positions.
//!
//! The decision tree rides along in its binary preorder encoding.
//! Compression is skipped below the configured thresholds, and every
//! compression is verified by decompressing and comparing lookups on a
//! deterministic pseudo-random sample before the payload is handed out.
//!
//! With the `compression` feature, [`token_compress`] layers lz4 on the
//! serialized bytes with the same verify-by-comparison obligation.

#[cfg(test)]
mod tests;

use jade_resolve::ImplId;
use thiserror::Error;

use crate::binary::{self, CodecError};
use crate::table::{DispatchTable, ExactEntry, TableMetadata};

/// Semantic compression format.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompressionFormat {
    Delta,
    Pattern,
    Dictionary,
}

impl CompressionFormat {
    const fn tag(self) -> u8 {
        match self {
            CompressionFormat::Delta => 1,
            CompressionFormat::Pattern => 2,
            CompressionFormat::Dictionary => 3,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CompressionFormat::Delta),
            2 => Some(CompressionFormat::Pattern),
            3 => Some(CompressionFormat::Dictionary),
            _ => None,
        }
    }
}

/// Thresholds and verification settings.
#[derive(Copy, Clone, Debug)]
pub struct CompressionConfig {
    /// Tables with fewer exact entries are not compressed.
    pub min_entries: usize,
    /// Tables whose serialized size is smaller are not compressed.
    pub min_bytes: usize,
    /// Lookup samples drawn during post-compression verification.
    pub verify_samples: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig {
            min_entries: 10,
            min_bytes: 1024,
            verify_samples: 16,
        }
    }
}

/// A compressed table payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressedTable {
    pub format: CompressionFormat,
    payload: Vec<u8>,
    /// Serialized size of the uncompressed table, for ratio reporting.
    uncompressed_len: usize,
}

impl CompressedTable {
    /// Compressed payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Compression ratio (compressed / uncompressed); lower is better.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f32 {
        if self.uncompressed_len == 0 {
            return 1.0;
        }
        self.payload.len() as f32 / self.uncompressed_len as f32
    }
}

/// Compression failure.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CompressError {
    #[error("table below compression threshold ({entries} entries, {bytes} bytes)")]
    BelowThreshold { entries: usize, bytes: usize },
    #[error("compressed payload is corrupt at offset {0}")]
    Corrupt(usize),
    #[error("unknown compression format tag {0}")]
    UnknownFormat(u8),
    #[error("verification mismatch on arg hash {arg_hash:#x}")]
    Verification { arg_hash: u64 },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Compress a table, verifying the result before returning it.
pub fn compress(
    table: &DispatchTable,
    format: CompressionFormat,
    config: &CompressionConfig,
) -> Result<CompressedTable, CompressError> {
    let uncompressed = binary::encode_table(table);
    if table.exact_matches.len() < config.min_entries || uncompressed.len() < config.min_bytes {
        return Err(CompressError::BelowThreshold {
            entries: table.exact_matches.len(),
            bytes: uncompressed.len(),
        });
    }

    let mut payload = Vec::with_capacity(uncompressed.len() / 2);
    payload.push(format.tag());
    payload.extend_from_slice(&table.signature_hash.to_le_bytes());
    write_varint(&mut payload, table.exact_matches.len() as u64);

    match format {
        CompressionFormat::Delta => encode_delta(&table.exact_matches, &mut payload),
        CompressionFormat::Pattern => encode_pattern(&table.exact_matches, &mut payload),
        CompressionFormat::Dictionary => encode_dictionary(&table.exact_matches, &mut payload),
    }

    match &table.decision_tree {
        Some(tree) => {
            let tree_bytes = binary::encode_tree(tree);
            write_varint(&mut payload, tree_bytes.len() as u64);
            payload.extend_from_slice(&tree_bytes);
        }
        None => write_varint(&mut payload, 0),
    }

    let compressed = CompressedTable {
        format,
        payload,
        uncompressed_len: uncompressed.len(),
    };

    verify(table, &compressed, config)?;
    tracing::debug!(
        format = ?format,
        ratio = compressed.ratio(),
        "table compressed"
    );
    Ok(compressed)
}

/// Decompress a payload back into a table.
pub fn decompress(compressed: &CompressedTable) -> Result<DispatchTable, CompressError> {
    let bytes = &compressed.payload;
    let mut offset = 0usize;

    let tag = *bytes.first().ok_or(CompressError::Corrupt(0))?;
    offset += 1;
    let format = CompressionFormat::from_tag(tag).ok_or(CompressError::UnknownFormat(tag))?;

    if bytes.len() < offset + 8 {
        return Err(CompressError::Corrupt(offset));
    }
    let mut hash_bytes = [0u8; 8];
    hash_bytes.copy_from_slice(&bytes[offset..offset + 8]);
    let signature_hash = u64::from_le_bytes(hash_bytes);
    offset += 8;

    let entry_count = read_varint(bytes, &mut offset)? as usize;

    let exact_matches = match format {
        CompressionFormat::Delta => decode_delta(bytes, &mut offset, entry_count)?,
        CompressionFormat::Pattern => decode_pattern(bytes, &mut offset, entry_count)?,
        CompressionFormat::Dictionary => decode_dictionary(bytes, &mut offset, entry_count)?,
    };

    let tree_len = read_varint(bytes, &mut offset)? as usize;
    let decision_tree = if tree_len == 0 {
        None
    } else {
        if bytes.len() < offset + tree_len {
            return Err(CompressError::Corrupt(offset));
        }
        let tree = binary::decode_tree(&bytes[offset..offset + tree_len])?;
        offset += tree_len;
        Some(tree)
    };

    if offset != bytes.len() {
        return Err(CompressError::Corrupt(offset));
    }

    let mut table = DispatchTable {
        signature_hash,
        exact_matches,
        hot_prefix: Vec::new(),
        decision_tree,
        metadata: TableMetadata {
            memory_bytes: 0,
            tree_depth: 0,
            cache_efficiency_estimate: 1.0,
        },
    };
    table.refresh_metadata();
    Ok(table)
}

/// Compare lookups between the original and the decompressed table on a
/// deterministic pseudo-random sample of present and absent keys.
fn verify(
    original: &DispatchTable,
    compressed: &CompressedTable,
    config: &CompressionConfig,
) -> Result<(), CompressError> {
    let restored = decompress(compressed)?;

    let mut state = original.signature_hash | 1;
    let len = original.exact_matches.len();
    for sample in 0..config.verify_samples {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // Alternate between keys that exist and keys that should miss.
        let arg_hash = if sample % 2 == 0 && len > 0 {
            original.exact_matches[(state as usize) % len].arg_hash
        } else {
            state
        };
        if original.lookup_exact(arg_hash) != restored.lookup_exact(arg_hash) {
            return Err(CompressError::Verification { arg_hash });
        }
    }
    Ok(())
}

fn encode_delta(entries: &[ExactEntry], out: &mut Vec<u8>) {
    let mut prev = 0u64;
    for entry in entries {
        write_varint(out, entry.arg_hash.wrapping_sub(prev));
        write_varint(out, u64::from(entry.implementation.raw()));
        prev = entry.arg_hash;
    }
}

fn decode_delta(
    bytes: &[u8],
    offset: &mut usize,
    count: usize,
) -> Result<Vec<ExactEntry>, CompressError> {
    let mut entries = Vec::with_capacity(count);
    let mut prev = 0u64;
    for _ in 0..count {
        let delta = read_varint(bytes, offset)?;
        let impl_raw = read_varint(bytes, offset)?;
        let arg_hash = prev.wrapping_add(delta);
        entries.push(ExactEntry {
            arg_hash,
            implementation: ImplId::from_raw(u32::try_from(impl_raw).unwrap_or(u32::MAX)),
        });
        prev = arg_hash;
    }
    Ok(entries)
}

fn encode_pattern(entries: &[ExactEntry], out: &mut Vec<u8>) {
    let mut prev_hash = 0u64;
    let mut index = 0;
    while index < entries.len() {
        let implementation = entries[index].implementation;
        let mut run = 1;
        while index + run < entries.len() && entries[index + run].implementation == implementation
        {
            run += 1;
        }
        write_varint(out, run as u64);
        write_varint(out, u64::from(implementation.raw()));
        for entry in &entries[index..index + run] {
            write_varint(out, entry.arg_hash.wrapping_sub(prev_hash));
            prev_hash = entry.arg_hash;
        }
        index += run;
    }
}

fn decode_pattern(
    bytes: &[u8],
    offset: &mut usize,
    count: usize,
) -> Result<Vec<ExactEntry>, CompressError> {
    let mut entries = Vec::with_capacity(count);
    let mut prev_hash = 0u64;
    while entries.len() < count {
        let run = read_varint(bytes, offset)? as usize;
        if run == 0 || entries.len() + run > count {
            return Err(CompressError::Corrupt(*offset));
        }
        let impl_raw = read_varint(bytes, offset)?;
        let implementation = ImplId::from_raw(u32::try_from(impl_raw).unwrap_or(u32::MAX));
        for _ in 0..run {
            let delta = read_varint(bytes, offset)?;
            let arg_hash = prev_hash.wrapping_add(delta);
            entries.push(ExactEntry {
                arg_hash,
                implementation,
            });
            prev_hash = arg_hash;
        }
    }
    Ok(entries)
}

fn encode_dictionary(entries: &[ExactEntry], out: &mut Vec<u8>) {
    let mut dictionary: Vec<ImplId> = Vec::new();
    for entry in entries {
        if !dictionary.contains(&entry.implementation) {
            dictionary.push(entry.implementation);
        }
    }

    write_varint(out, dictionary.len() as u64);
    for id in &dictionary {
        write_varint(out, u64::from(id.raw()));
    }

    let mut prev = 0u64;
    for entry in entries {
        write_varint(out, entry.arg_hash.wrapping_sub(prev));
        let position = dictionary
            .iter()
            .position(|id| *id == entry.implementation)
            .unwrap_or(0);
        write_varint(out, position as u64);
        prev = entry.arg_hash;
    }
}

fn decode_dictionary(
    bytes: &[u8],
    offset: &mut usize,
    count: usize,
) -> Result<Vec<ExactEntry>, CompressError> {
    let dict_len = read_varint(bytes, offset)? as usize;
    let mut dictionary = Vec::with_capacity(dict_len);
    for _ in 0..dict_len {
        let raw = read_varint(bytes, offset)?;
        dictionary.push(ImplId::from_raw(u32::try_from(raw).unwrap_or(u32::MAX)));
    }

    let mut entries = Vec::with_capacity(count);
    let mut prev = 0u64;
    for _ in 0..count {
        let delta = read_varint(bytes, offset)?;
        let position = read_varint(bytes, offset)? as usize;
        let implementation = *dictionary
            .get(position)
            .ok_or(CompressError::Corrupt(*offset))?;
        let arg_hash = prev.wrapping_add(delta);
        entries.push(ExactEntry {
            arg_hash,
            implementation,
        });
        prev = arg_hash;
    }
    Ok(entries)
}

/// LEB128 write.
fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// LEB128 read.
fn read_varint(bytes: &[u8], offset: &mut usize) -> Result<u64, CompressError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*offset).ok_or(CompressError::Corrupt(*offset))?;
        *offset += 1;
        if shift >= 64 {
            return Err(CompressError::Corrupt(*offset));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Token-level compression of serialized table bytes (lz4).
///
/// Carries the same correctness obligation as the semantic formats: the
/// round trip is verified before the compressed bytes are returned.
#[cfg(feature = "compression")]
pub fn token_compress(bytes: &[u8]) -> Result<Vec<u8>, CompressError> {
    let compressed = lz4_flex::compress_prepend_size(bytes);
    let restored = lz4_flex::decompress_size_prepended(&compressed)
        .map_err(|_| CompressError::Corrupt(0))?;
    if restored != bytes {
        return Err(CompressError::Verification { arg_hash: 0 });
    }
    Ok(compressed)
}

/// Token-level decompression.
#[cfg(feature = "compression")]
pub fn token_decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressError> {
    lz4_flex::decompress_size_prepended(bytes).map_err(|_| CompressError::Corrupt(0))
}
