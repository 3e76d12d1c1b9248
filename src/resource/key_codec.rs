//! Display encoding for the opaque backend listing key.
//!
//! The backend primary key is an arbitrary string; consumers expect a
//! stable, URL-safe, numeric-looking identifier. Encoding hashes the key and
//! keeps the first 8 bytes as a 63-bit integer, so the same backend key
//! always renders the same decimal form. The mapping is one-way; inbound
//! resolution goes through [`super::ListingKeyCache`].

use sha2::{Digest, Sha256};

pub fn encode(backend_key: &str) -> String {
    let digest = Sha256::digest(backend_key.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    // mask the sign bit so the value fits a signed 64-bit consumer
    let value = u64::from_be_bytes(head) & 0x7FFF_FFFF_FFFF_FFFF;
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(encode("MLS-2024-00001"), encode("MLS-2024-00001"));
    }

    #[test]
    fn test_distinct_inputs_differ() {
        assert_ne!(encode("MLS-2024-00001"), encode("MLS-2024-00002"));
    }

    #[test]
    fn test_decimal_digits_only() {
        let encoded = encode("MLS-2024-00001");
        assert!(!encoded.is_empty());
        assert!(encoded.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_fits_signed_63_bits() {
        for key in ["a", "MLS-1", "something-long-and-opaque-0123456789"] {
            let value: u64 = encode(key).parse().unwrap();
            assert!(value <= i64::MAX as u64);
        }
    }
}
