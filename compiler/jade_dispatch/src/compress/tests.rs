use jade_resolve::ImplId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::compress::{
    compress, decompress, CompressError, CompressionConfig, CompressionFormat,
};
use crate::table::{DispatchTable, ExactEntry};

fn entry(hash: u64, impl_raw: u32) -> ExactEntry {
    ExactEntry {
        arg_hash: hash,
        implementation: ImplId::from_raw(impl_raw),
    }
}

/// A table big enough to cross the default thresholds.
fn large_table(entries: u64, impl_spread: u32) -> DispatchTable {
    let mut table = DispatchTable::empty(0xabcd);
    table.exact_matches = (0..entries)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let impl_raw = (i as u32) % impl_spread.max(1);
            entry(i * 977, impl_raw)
        })
        .collect();
    table.refresh_metadata();
    table
}

fn lenient_config() -> CompressionConfig {
    CompressionConfig {
        min_entries: 1,
        min_bytes: 0,
        verify_samples: 32,
    }
}

#[test]
fn small_tables_are_skipped() {
    let table = large_table(5, 1);
    let Err(err) = compress(&table, CompressionFormat::Delta, &CompressionConfig::default())
    else {
        panic!("small table must be skipped");
    };
    assert!(matches!(err, CompressError::BelowThreshold { entries: 5, .. }));
}

#[test]
fn delta_round_trip() {
    let table = large_table(200, 3);
    let compressed = compress(&table, CompressionFormat::Delta, &lenient_config())
        .unwrap_or_else(|e| panic!("{e}"));
    let restored = decompress(&compressed).unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(restored.signature_hash, table.signature_hash);
    assert_eq!(restored.exact_matches, table.exact_matches);
    assert_eq!(restored.decision_tree, table.decision_tree);
}

#[test]
fn pattern_round_trip() {
    let table = large_table(200, 2);
    let compressed = compress(&table, CompressionFormat::Pattern, &lenient_config())
        .unwrap_or_else(|e| panic!("{e}"));
    let restored = decompress(&compressed).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(restored.exact_matches, table.exact_matches);
}

#[test]
fn dictionary_round_trip() {
    let table = large_table(200, 7);
    let compressed = compress(&table, CompressionFormat::Dictionary, &lenient_config())
        .unwrap_or_else(|e| panic!("{e}"));
    let restored = decompress(&compressed).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(restored.exact_matches, table.exact_matches);
}

#[test]
fn compression_actually_shrinks_sorted_tables() {
    let table = large_table(500, 2);
    let compressed = compress(&table, CompressionFormat::Delta, &lenient_config())
        .unwrap_or_else(|e| panic!("{e}"));
    // Sorted hashes delta-encode well; sequential keys do much better
    // than the 0.5-0.7 typical of production tables.
    assert!(compressed.ratio() < 0.7, "ratio {}", compressed.ratio());
}

#[test]
fn corrupt_payload_is_rejected() {
    let table = large_table(50, 2);
    let compressed = compress(&table, CompressionFormat::Delta, &lenient_config())
        .unwrap_or_else(|e| panic!("{e}"));

    // Decompressing a prefix of the payload must fail, not mis-decode.
    let bytes = compressed.payload();
    for len in [0usize, 1, 8, bytes.len() / 2] {
        let candidate = crate::compress::CompressedTable {
            format: compressed.format,
            payload: bytes[..len].to_vec(),
            uncompressed_len: 1,
        };
        assert!(decompress(&candidate).is_err(), "prefix {len} must fail");
    }
}

proptest! {
    /// Lookup equivalence on every key, for every format.
    #[test]
    fn lookup_equivalence(entries in 10u64..120, spread in 1u32..6) {
        let table = large_table(entries, spread);
        for format in [
            CompressionFormat::Delta,
            CompressionFormat::Pattern,
            CompressionFormat::Dictionary,
        ] {
            let compressed = compress(&table, format, &lenient_config())
                .unwrap_or_else(|e| panic!("{e}"));
            let restored = decompress(&compressed).unwrap_or_else(|e| panic!("{e}"));
            for probe in &table.exact_matches {
                prop_assert_eq!(
                    table.lookup_exact(probe.arg_hash),
                    restored.lookup_exact(probe.arg_hash)
                );
            }
            prop_assert_eq!(table.lookup_exact(u64::MAX), restored.lookup_exact(u64::MAX));
        }
    }
}

#[cfg(feature = "compression")]
mod token {
    use super::*;
    use crate::binary::encode_table;
    use crate::compress::{token_compress, token_decompress};

    #[test]
    fn token_round_trip() {
        let table = large_table(300, 2);
        let bytes = encode_table(&table);
        let compressed = token_compress(&bytes).unwrap_or_else(|e| panic!("{e}"));
        let restored = token_decompress(&compressed).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(restored, bytes);
    }
}
