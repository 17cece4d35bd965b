//! Length-prefixed key encoding for LMDB storage.
//!
//! Keys are encoded as: [len1][bytes1][len2][bytes2]...
//! - Lengths are 2-byte big-endian, so no delimiters and no escaping
//! - A key above the LMDB limit is replaced by [0xFF][sha256(len1 bytes1 len2 bytes2 ...)]
//!   with untruncated 8-byte lengths

use sha2::{Digest, Sha256};

use crate::constants::{HASHED_KEY_MARKER, MAX_KEY_LEN};

/// Build a length-prefixed key from parts
///
/// # Example
/// ```ignore
/// let key = build_key(&["class", "Invoice"]);
/// // Result: [0,5]class[0,7]Invoice
/// ```
#[inline]
pub fn build_key(parts: &[&str]) -> Vec<u8> {
    let total_len: usize = parts.iter().map(|p| 2 + p.len()).sum();
    let mut key = Vec::with_capacity(total_len);
    for part in parts {
        let len = part.len().min(u16::MAX as usize);
        key.extend_from_slice(&(len as u16).to_be_bytes());
        key.extend_from_slice(&part.as_bytes()[..len]);
    }
    key
}

/// Build a key that always fits in LMDB
pub fn storage_key(parts: &[&str]) -> Vec<u8> {
    let key = build_key(parts);
    if key.len() <= MAX_KEY_LEN {
        return key;
    }
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut hashed = Vec::with_capacity(1 + digest.len());
    hashed.push(HASHED_KEY_MARKER);
    hashed.extend_from_slice(&digest);
    hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_length_prefixed() {
        assert_eq!(build_key(&["ab", "c"]), vec![0, 2, b'a', b'b', 0, 1, b'c']);
    }

    #[test]
    fn no_ambiguity_between_splits() {
        assert_ne!(build_key(&["ab", "c"]), build_key(&["a", "bc"]));
        assert_ne!(build_key(&["a/b"]), build_key(&["a", "b"]));
    }

    #[test]
    fn long_keys_are_hashed() {
        let long = "x".repeat(1000);
        let k = storage_key(&["object", "Doc", &long]);
        assert_eq!(k.len(), 33);
        assert_eq!(k[0], HASHED_KEY_MARKER);
        assert_eq!(k, storage_key(&["object", "Doc", &long]));
        assert_ne!(k, storage_key(&["object", "Doc", &"y".repeat(1000)]));
    }

    #[test]
    fn hashed_keys_keep_part_boundaries() {
        let tail = "x".repeat(600);
        let a = storage_key(&["object", "Doc", &format!("a\u{0}{}", tail)]);
        let b = storage_key(&["object", "Doc\u{0}a", &tail]);
        assert_eq!(a[0], HASHED_KEY_MARKER);
        assert_ne!(a, b);
        assert_ne!(storage_key(&["ab", &tail]), storage_key(&["a", &format!("b{}", tail)]));
    }

    #[test]
    fn short_keys_are_kept() {
        let k = storage_key(&["class", "Doc"]);
        assert_eq!(k, build_key(&["class", "Doc"]));
        assert_ne!(k[0], HASHED_KEY_MARKER);
    }
}
