//! Fixed-width key encodings.
//!
//! Big-endian integers compare bytewise in numeric order, which is what makes
//! partition scans return ids and sequences ascending.

use super::{StoreError, StoreResult};

/// Width in bytes of an encoded integer key.
pub const U64_KEY_LEN: usize = 8;

/// Encodes `value` as an 8-byte big-endian key.
pub fn encode_u64(value: u64) -> [u8; U64_KEY_LEN] {
    value.to_be_bytes()
}

/// Decodes an 8-byte big-endian key.
///
/// # Errors
/// - Returns `StoreError::Corrupt` when `key` is not exactly 8 bytes wide.
pub fn decode_u64(key: &[u8]) -> StoreResult<u64> {
    let bytes: [u8; U64_KEY_LEN] = key.try_into().map_err(|_| {
        StoreError::Corrupt(format!(
            "expected {U64_KEY_LEN}-byte integer key, got {} bytes",
            key.len()
        ))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::{decode_u64, encode_u64};
    use crate::store::StoreError;

    #[test]
    fn encoded_keys_sort_numerically() {
        let mut keys = vec![encode_u64(256), encode_u64(2), encode_u64(1), encode_u64(255)];
        keys.sort();
        let decoded: Vec<u64> = keys.iter().map(|k| decode_u64(k).unwrap()).collect();
        assert_eq!(decoded, vec![1, 2, 255, 256]);
    }

    #[test]
    fn decode_rejects_wrong_width() {
        let err = decode_u64(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
