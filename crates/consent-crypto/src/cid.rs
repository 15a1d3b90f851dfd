//! Content identifiers returned by the blob store.
//!
//! Real references are whatever the pinning service returns. Synthetic
//! references are shaped like a `CIDv0` (`Qm` followed by base58 characters)
//! so downstream consumers can render them without special cases.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every `CIDv0`.
pub const CID_V0_PREFIX: &str = "Qm";

/// Length of a synthetic content reference, prefix included.
pub const SYNTHETIC_CID_LEN: usize = 44;

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const BASE32_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz234567";

/// Reference to a document stored in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a CID returned by the blob store.
    #[must_use]
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    /// Generate a random CID-shaped reference.
    #[must_use]
    pub fn synthetic() -> Self {
        let mut rng = rand::thread_rng();
        let body: String = (0..SYNTHETIC_CID_LEN.saturating_sub(CID_V0_PREFIX.len()))
            .map(|_| char::from(BASE58_ALPHABET[rng.gen_range(0..BASE58_ALPHABET.len())]))
            .collect();
        Self(format!("{CID_V0_PREFIX}{body}"))
    }

    /// Derive a CID-shaped reference from seed material.
    #[must_use]
    pub fn derived(seed: &[u8]) -> Self {
        let mut reader = blake3::Hasher::new().update(seed).finalize_xof();
        let mut raw = [0u8; SYNTHETIC_CID_LEN - 2];
        reader.fill(&mut raw);
        let body: String = raw
            .iter()
            .map(|b| char::from(BASE58_ALPHABET[usize::from(*b) % 58]))
            .collect();
        Self(format!("{CID_V0_PREFIX}{body}"))
    }

    /// Whether a string is shaped like a CID (`CIDv0` or base32 `CIDv1`).
    #[must_use]
    pub fn looks_like_cid(s: &str) -> bool {
        if let Some(body) = s.strip_prefix(CID_V0_PREFIX) {
            return (SYNTHETIC_CID_LEN..=46).contains(&s.len())
                && body.bytes().all(|b| BASE58_ALPHABET.contains(&b));
        }
        if let Some(body) = s.strip_prefix('b') {
            return s.len() >= 50 && body.chars().all(|c| BASE32_ALPHABET.contains(c));
        }
        false
    }

    /// Get the CID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
