//! Content sealing.
//!
//! A [`ContentHash`] is SHA-256 over the payload value's UTF-8 bytes and
//! nothing else. Styling, timestamps and metadata never reach the digest, so
//! the audit trail can recompute it from a stored payload to detect tampering.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::payload::Payload;
use crate::scoring::ClearedPayload;

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = 32;

/// 256-bit digest of a payload value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Seals a payload that passed the risk gate.
    pub fn of(cleared: &ClearedPayload) -> Self {
        Self::digest(cleared.payload())
    }

    /// Recomputes the digest of `payload` and compares it with `self`.
    pub fn matches(&self, payload: &Payload) -> bool {
        Self::digest(payload) == *self
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn digest(payload: &Payload) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload.value().as_bytes());
        Self(hasher.finalize().into())
    }
}

impl From<[u8; HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

/// Error parsing a hex-encoded content hash.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseHashError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid hash length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let array: [u8; HASH_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ParseHashError::InvalidLength {
                    expected: HASH_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ClearedPayload;

    fn cleared(value: &str) -> ClearedPayload {
        ClearedPayload::for_tests(Payload::text(value).unwrap())
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        let hash = ContentHash::of(&cleared("abc"));
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(ContentHash::of(&cleared("same")), ContentHash::of(&cleared("same")));
        assert_ne!(ContentHash::of(&cleared("same")), ContentHash::of(&cleared("other")));
    }

    #[test]
    fn test_kind_is_not_hashed() {
        let text = Payload::text("https://glyphlock.io").unwrap();
        let url = Payload::url("https://glyphlock.io").unwrap();
        let hash = ContentHash::of(&ClearedPayload::for_tests(text));
        assert!(hash.matches(&url));
    }

    #[test]
    fn test_matches_detects_tampering() {
        let hash = ContentHash::of(&cleared("pay 10 EUR"));
        assert!(hash.matches(&Payload::text("pay 10 EUR").unwrap()));
        assert!(!hash.matches(&Payload::text("pay 90 EUR").unwrap()));
    }

    #[test]
    fn test_hex_roundtrip_via_from_str() {
        let hash = ContentHash::of(&cleared("seal"));
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn test_from_str_rejects_short_input() {
        let err = "abcd".parse::<ContentHash>().unwrap_err();
        assert_eq!(err, ParseHashError::InvalidLength { expected: 32, got: 2 });
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = ContentHash::of(&cleared("abc"));
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
