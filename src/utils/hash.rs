// src/utils/hash.rs

//! Stable content hashing.

use sha2::{Digest, Sha256};

/// Hash a sequence of string parts into a hex digest.
///
/// Each part is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn stable_hash(parts: &[&str]) -> String {
    hex::encode(digest(parts))
}

/// Like [`stable_hash`] but truncated to `bytes` bytes of digest.
pub fn short_hash(parts: &[&str], bytes: usize) -> String {
    let digest = digest(parts);
    hex::encode(&digest[..bytes.min(digest.len())])
}

fn digest(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_hash_is_deterministic() {
        assert_eq!(stable_hash(&["a", "b"]), stable_hash(&["a", "b"]));
        assert_eq!(stable_hash(&["a"]).len(), 64);
    }

    #[test]
    fn test_part_boundaries_matter() {
        assert_ne!(stable_hash(&["ab", "c"]), stable_hash(&["a", "bc"]));
    }

    #[test]
    fn test_short_hash_truncates() {
        assert_eq!(short_hash(&["x"], 8).len(), 16);
        assert!(stable_hash(&["x"]).starts_with(&short_hash(&["x"], 8)));
    }
}
