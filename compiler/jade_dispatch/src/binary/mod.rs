//! Binary dispatch-table layout.
//!
//! The wire format served to codegen and persisted by the incremental
//! cache. Little-endian throughout.
//!
//! ```text
//! header:  magic "JDSP" (4) | version u16 | exact_count u32
//!          | tree_root_offset u32 (0 = no tree) | signature_hash u64
//! entries: exact_count × (arg_hash u64 | impl_index u32), hash-sorted
//! tree:    preorder nodes at tree_root_offset:
//!          param_index u8 | type_id u32 | exact_impl i32
//!          | fallback_impl i32 | child_count u16 | children…
//! ```
//!
//! Implementation references encode as `i32`, `-1` meaning absent. The
//! hot prefix and metadata are derived state and are not persisted.


use jade_resolve::ImplId;
use jade_types::TypeId;
use thiserror::Error;

use crate::table::{DecisionNode, DispatchTable, ExactEntry};

/// Table file magic.
pub const TABLE_MAGIC: [u8; 4] = *b"JDSP";

/// Current format version.
pub const TABLE_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 4 + 4 + 8;

/// Codec failure.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CodecError {
    #[error("table bytes truncated at offset {0}")]
    UnexpectedEof(usize),
    #[error("bad table magic")]
    BadMagic,
    #[error("unsupported table version {0}")]
    UnsupportedVersion(u16),
    #[error("malformed decision node at offset {0}")]
    MalformedNode(usize),
    #[error("tree offset {0} out of bounds")]
    BadTreeOffset(u32),
    #[error("{0} trailing bytes after table")]
    TrailingBytes(usize),
}

/// Serialize a table to its binary layout.
pub fn encode_table(table: &DispatchTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + table.exact_matches.len() * 12);

    out.extend_from_slice(&TABLE_MAGIC);
    out.extend_from_slice(&TABLE_VERSION.to_le_bytes());
    let exact_count = u32::try_from(table.exact_matches.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&exact_count.to_le_bytes());

    // Tree offset is patched after the entry section is written.
    let offset_pos = out.len();
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&table.signature_hash.to_le_bytes());

    for entry in &table.exact_matches {
        out.extend_from_slice(&entry.arg_hash.to_le_bytes());
        out.extend_from_slice(&entry.implementation.raw().to_le_bytes());
    }

    if let Some(tree) = &table.decision_tree {
        let tree_offset = u32::try_from(out.len()).unwrap_or(u32::MAX);
        out[offset_pos..offset_pos + 4].copy_from_slice(&tree_offset.to_le_bytes());
        encode_node(tree, &mut out);
    }

    out
}

/// Encode a decision tree alone, for embedding in compressed payloads.
pub(crate) fn encode_tree(node: &DecisionNode) -> Vec<u8> {
    let mut out = Vec::new();
    encode_node(node, &mut out);
    out
}

/// Decode a decision tree alone. The whole slice must be consumed.
pub(crate) fn decode_tree(bytes: &[u8]) -> Result<DecisionNode, CodecError> {
    let mut reader = Reader::new(bytes);
    let (_, node) = decode_node(&mut reader)?;
    if reader.offset != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - reader.offset));
    }
    Ok(node)
}

fn encode_node(node: &DecisionNode, out: &mut Vec<u8>) {
    out.push(u8::try_from(node.param_index).unwrap_or(u8::MAX));
    // The split key is carried by the parent branch; the root uses the
    // invalid id.
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&encode_impl(node.exact_impl).to_le_bytes());
    out.extend_from_slice(&encode_impl(node.fallback_impl).to_le_bytes());
    let child_count = u16::try_from(node.branches.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&child_count.to_le_bytes());
    for (ty, child) in &node.branches {
        encode_branch(*ty, child, out);
    }
}

fn encode_branch(key: TypeId, node: &DecisionNode, out: &mut Vec<u8>) {
    out.push(u8::try_from(node.param_index).unwrap_or(u8::MAX));
    out.extend_from_slice(&key.raw().to_le_bytes());
    out.extend_from_slice(&encode_impl(node.exact_impl).to_le_bytes());
    out.extend_from_slice(&encode_impl(node.fallback_impl).to_le_bytes());
    let child_count = u16::try_from(node.branches.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&child_count.to_le_bytes());
    for (ty, child) in &node.branches {
        encode_branch(*ty, child, out);
    }
}

fn encode_impl(id: Option<ImplId>) -> i32 {
    match id {
        Some(id) => i32::try_from(id.raw()).unwrap_or(i32::MAX),
        None => -1,
    }
}

/// Deserialize a table from its binary layout.
///
/// Metadata is recomputed; the hot prefix starts empty and is rebuilt by
/// the optimizer if frequency data is available.
pub fn decode_table(bytes: &[u8]) -> Result<DispatchTable, CodecError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.take(4)?;
    if magic != TABLE_MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = reader.u16()?;
    if version != TABLE_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let exact_count = reader.u32()? as usize;
    let tree_offset = reader.u32()?;
    let signature_hash = reader.u64()?;

    let mut exact_matches = Vec::with_capacity(exact_count);
    for _ in 0..exact_count {
        let arg_hash = reader.u64()?;
        let impl_index = reader.u32()?;
        exact_matches.push(ExactEntry {
            arg_hash,
            implementation: ImplId::from_raw(impl_index),
        });
    }

    let decision_tree = if tree_offset == 0 {
        None
    } else {
        if tree_offset as usize != reader.offset {
            return Err(CodecError::BadTreeOffset(tree_offset));
        }
        let (_, node) = decode_node(&mut reader)?;
        Some(node)
    };

    if reader.offset != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - reader.offset));
    }

    let mut table = DispatchTable {
        signature_hash,
        exact_matches,
        hot_prefix: Vec::new(),
        decision_tree,
        metadata: crate::table::TableMetadata {
            memory_bytes: 0,
            tree_depth: 0,
            cache_efficiency_estimate: 1.0,
        },
    };
    table.refresh_metadata();
    Ok(table)
}

fn decode_node(reader: &mut Reader<'_>) -> Result<(TypeId, DecisionNode), CodecError> {
    let start = reader.offset;
    let param_index = u32::from(reader.u8()?);
    let key = TypeId::from_raw(reader.u32()?);
    let exact_impl = decode_impl(reader.i32()?);
    let fallback_impl = decode_impl(reader.i32()?);
    let child_count = reader.u16()? as usize;

    let mut branches = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        let (child_key, child) = decode_node(reader)?;
        branches.push((child_key, child));
    }
    // Branches are written sorted; refuse tables that lost the invariant.
    if branches.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
        return Err(CodecError::MalformedNode(start));
    }

    Ok((
        key,
        DecisionNode {
            param_index,
            branches,
            exact_impl,
            fallback_impl,
        },
    ))
}

fn decode_impl(raw: i32) -> Option<ImplId> {
    u32::try_from(raw).ok().map(ImplId::from_raw)
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CodecError::UnexpectedEof(self.offset))?;
        if end > self.bytes.len() {
            return Err(CodecError::UnexpectedEof(self.offset));
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(array))
    }
}
