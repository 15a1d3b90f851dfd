//! Subject handles derived with BLAKE3.
//!
//! A subject handle is the opaque, fixed-length stand-in for a raw personal
//! identifier. It is what the ledger indexes and what every query filters on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CryptoError, CryptoResult};

/// Key-derivation context. Changing it changes every handle ever issued.
const SUBJECT_CONTEXT: &str = "consent-ledger 2024-01-01 subject handle v1";

/// A 32-byte subject handle.
///
/// Identical identifiers always yield identical handles. The derivation is
/// one-way: there is no operation that recovers the identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectHandle([u8; 32]);

impl SubjectHandle {
    /// Derive the handle for a raw identifier.
    ///
    /// Surrounding whitespace is ignored so that `" 900101015678 "` and
    /// `"900101015678"` map to the same subject.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidInput`] if the identifier is empty.
    pub fn hash(identifier: &str) -> CryptoResult<Self> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::InvalidInput(
                "identifier must not be empty".to_string(),
            ));
        }
        let mut hasher = blake3::Hasher::new_derive_key(SUBJECT_CONTEXT);
        hasher.update(trimmed.as_bytes());
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Derive the handle for an identifier supplied as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidInput`] if the bytes are not valid UTF-8
    /// or the decoded identifier is empty.
    pub fn hash_bytes(raw: &[u8]) -> CryptoResult<Self> {
        let identifier = std::str::from_utf8(raw)
            .map_err(|e| CryptoError::InvalidInput(format!("identifier is not UTF-8: {e}")))?;
        Self::hash(identifier)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes (e.g. a decoded ledger topic).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
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

/// Decode a 32-byte value from hex, accepting an optional `0x` prefix.
pub(crate) fn decode_hex32(s: &str) -> CryptoResult<[u8; 32]> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| CryptoError::InvalidHexEncoding(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::InvalidHexEncoding(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

impl fmt::Debug for SubjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectHandle({})", &self.to_hex()[..18])
    }
}

impl fmt::Display for SubjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SubjectHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SubjectHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for SubjectHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for SubjectHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let a = SubjectHandle::hash("900101015678").unwrap();
        assert_eq!(a, SubjectHandle::hash("900101015678").unwrap());
        assert_ne!(a, SubjectHandle::hash("900101015679").unwrap());
    }

    #[test]
    fn test_hash_trims_whitespace() {
        assert_eq!(
            SubjectHandle::hash("  900101015678\n").unwrap(),
            SubjectHandle::hash("900101015678").unwrap()
        );
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(matches!(
            SubjectHandle::hash("   "),
            Err(CryptoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_utf8_rejected() {
        assert!(matches!(
            SubjectHandle::hash_bytes(&[0xff, 0xfe, 0x00]),
            Err(CryptoError::InvalidInput(_))
        ));
        assert_eq!(
            SubjectHandle::hash_bytes(b"880202025555").unwrap(),
            SubjectHandle::hash("880202025555").unwrap()
        );
    }

    #[test]
    fn test_many_identifiers_distinct() {
        let handles: std::collections::HashSet<_> = (0..1000)
            .map(|i| SubjectHandle::hash(&format!("9001010{i:05}")).unwrap())
            .collect();
        assert_eq!(handles.len(), 1000);
    }

    #[test]
    fn test_hex_display() {
        let handle = SubjectHandle::hash("900101015678").unwrap();
        let hex = handle.to_string();
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("0x"));
        assert_eq!(SubjectHandle::from_hex(&hex).unwrap(), handle);
        assert_eq!(SubjectHandle::from_hex(&hex[2..]).unwrap(), handle);
        assert!(SubjectHandle::from_hex("0xabcd").is_err());
    }

    #[test]
    fn test_serde() {
        let handle = SubjectHandle::hash("900101015678").unwrap();
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{handle}\""));
        let decoded: SubjectHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, handle);
    }
}
