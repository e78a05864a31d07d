//! Stable 64-bit hashing for table keys.
//!
//! Table files persist these hashes, so the function must be stable across
//! builds and platforms; wyhash over the little-endian byte image gives
//! that. In-memory maps elsewhere use FxHash, which carries no such
//! obligation.

use jade_types::TypeId;

/// Fixed seed for argument-tuple hashing. Part of the table format.
const ARG_TUPLE_SEED: u64 = 0x4a41_4445_5441_424c; // "JADETABL"

/// Fixed seed for signature-name hashing. Part of the table format.
const SIGNATURE_SEED: u64 = 0x4a41_4445_5349_4748; // "JADESIGH"

/// Hash an argument-type tuple to its 64-bit table key.
///
/// The empty tuple hashes to a well-defined value, so arity-0 families get
/// exactly one exact-match key.
pub fn hash_arg_tuple(args: &[TypeId]) -> u64 {
    let mut bytes = Vec::with_capacity(args.len() * 4);
    for arg in args {
        bytes.extend_from_slice(&arg.raw().to_le_bytes());
    }
    wyhash::wyhash(&bytes, ARG_TUPLE_SEED)
}

/// Hash a dispatch family's signature name.
pub fn signature_hash(name: &str) -> u64 {
    wyhash::wyhash(name.as_bytes(), SIGNATURE_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tuple_hash_is_deterministic() {
        let args = [TypeId::from_raw(3), TypeId::from_raw(7)];
        assert_eq!(hash_arg_tuple(&args), hash_arg_tuple(&args));
    }

    #[test]
    fn tuple_hash_is_order_sensitive() {
        let ab = [TypeId::from_raw(3), TypeId::from_raw(7)];
        let ba = [TypeId::from_raw(7), TypeId::from_raw(3)];
        assert_ne!(hash_arg_tuple(&ab), hash_arg_tuple(&ba));
    }

    #[test]
    fn empty_tuple_has_a_key() {
        assert_eq!(hash_arg_tuple(&[]), hash_arg_tuple(&[]));
        assert_ne!(hash_arg_tuple(&[]), hash_arg_tuple(&[TypeId::ANY]));
    }

    #[test]
    fn signature_hash_distinguishes_names() {
        assert_ne!(signature_hash("add"), signature_hash("sub"));
        assert_eq!(signature_hash("add"), signature_hash("add"));
    }
}
