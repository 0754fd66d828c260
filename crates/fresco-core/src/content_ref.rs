//! Content-addressed artifact references

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reference to a content-addressed artifact in the durable store.
///
/// The address is derived from the artifact bytes, so writing the same
/// bytes twice always yields the same reference. On the wire (inside
/// delta record documents) a reference is a `"<64-hex>-<size>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentRef {
    /// BLAKE3 hash of the content
    pub hash: [u8; 32],
    /// Size of the content in bytes
    pub size: u64,
}

impl ContentRef {
    /// Create a reference from known parts
    pub fn new(hash: [u8; 32], size: u64) -> Self {
        Self { hash, size }
    }

    /// Compute the reference for a byte slice
    pub fn from_data(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self {
            hash: *hash.as_bytes(),
            size: data.len() as u64,
        }
    }

    /// Hash as a hex string; also used as the hot-store object key
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short hash for display (first 8 chars)
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    /// Whether two references address the same content
    pub fn content_equals(&self, other: &ContentRef) -> bool {
        self.hash == other.hash
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hash_hex(), self.size)
    }
}

/// Error parsing a content reference from its wire form
#[derive(Debug, thiserror::Error)]
#[error("malformed content reference: {0}")]
pub struct ParseContentRefError(String);

impl FromStr for ContentRef {
    type Err = ParseContentRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash_part, size_part) = s
            .split_once('-')
            .ok_or_else(|| ParseContentRefError(format!("missing size separator in {s:?}")))?;
        let bytes = hex::decode(hash_part)
            .map_err(|e| ParseContentRefError(format!("bad hash hex: {e}")))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseContentRefError("hash must be 32 bytes".to_string()))?;
        let size = size_part
            .parse::<u64>()
            .map_err(|e| ParseContentRefError(format!("bad size: {e}")))?;
        Ok(Self { hash, size })
    }
}

impl Serialize for ContentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
