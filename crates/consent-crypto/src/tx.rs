//! Ledger transaction identifiers.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CryptoResult;
use crate::subject::decode_hex32;

/// A 32-byte transaction identifier, displayed as `0x` + 64 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId([u8; 32]);

impl TxId {
    /// Generate a random identifier for a synthetic receipt.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive an identifier from arbitrary seed material.
    ///
    /// Used where a reproducible identifier is required (synthetic datasets,
    /// in-memory ledgers).
    #[must_use]
    pub fn derive(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as `0x`-prefixed lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Decode from hex, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        decode_hex32(s).map(Self)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_hex()[..18])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for TxId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_shape() {
        let tx = TxId::random();
        let hex = tx.to_string();
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("0x"));
        assert!(hex[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(tx, TxId::random());
    }

    #[test]
    fn test_derive_is_stable() {
        let a = TxId::derive(&[b"subject", &1u32.to_be_bytes()]);
        let b = TxId::derive(&[b"subject", &1u32.to_be_bytes()]);
        let c = TxId::derive(&[b"subject", &2u32.to_be_bytes()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hex_parse() {
        let tx = TxId::random();
        assert_eq!(TxId::from_hex(&tx.to_hex()).unwrap(), tx);
        assert!(TxId::from_hex("0xzz").is_err());
    }
}
