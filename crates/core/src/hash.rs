//! Git object fingerprints for content-addressed reconciliation
//!
//! The remote identifies every file version by its Git blob id, so local
//! content is hashed the same way Git hashes a blob:
//! `sha1("blob " ++ len ++ "\0" ++ bytes)`. A locally computed fingerprint is
//! therefore directly comparable with the sha reported by the remote tree.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

use crate::error::SyncError;

/// A Git object id (20 bytes, SHA-1)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    /// Create a fingerprint from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the fingerprint as a byte slice
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex (the form the remote reports)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 7 hex digits, the usual short form
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Parse from a 40-character hex string
    pub fn from_hex(hex: &str) -> Result<Self, SyncError> {
        if hex.len() != 40 {
            return Err(SyncError::Decode(format!(
                "invalid fingerprint length: expected 40 characters, got {}",
                hex.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| SyncError::Decode(format!("invalid fingerprint '{}': {}", hex, e)))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Stored as hex so persisted workspaces stay readable and match the remote's
// JSON representation.
impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Fingerprint bytes exactly as Git would for a blob object
pub fn hash_blob(data: &[u8]) -> Fingerprint {
    let mut hasher = BlobHasher::new(data.len() as u64);
    hasher.update(data);
    hasher.finalize()
}

/// Streaming blob hasher
///
/// Git's header carries the total length up front, so the length must be
/// known before the first chunk.
pub struct BlobHasher {
    inner: Sha1,
}

impl BlobHasher {
    /// Create a hasher for a blob of `len` bytes
    pub fn new(len: u64) -> Self {
        let mut inner = Sha1::new();
        inner.update(format!("blob {}\0", len).as_bytes());
        Self { inner }
    }

    /// Feed more content
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the fingerprint
    pub fn finalize(self) -> Fingerprint {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_git_empty_blob() {
        // `git hash-object -t blob /dev/null`
        assert_eq!(
            hash_blob(b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_matches_git_hello_world() {
        // `printf 'hello world' | git hash-object --stdin`
        assert_eq!(
            hash_blob(b"hello world").to_hex(),
            "95d09f2b10159347eece71399a7e2e907ea3df4f"
        );
    }

    #[test]
    fn test_streaming_matches_direct() {
        let data = b"hello world";
        let mut hasher = BlobHasher::new(data.len() as u64);
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), hash_blob(data));
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = Fingerprint::from_bytes([42; 20]);
        let decoded = Fingerprint::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex("").is_err());
        assert!(Fingerprint::from_hex(&"g".repeat(40)).is_err());
    }

    #[test]
    fn test_short_form() {
        let fp = hash_blob(b"");
        assert_eq!(fp.short(), "e69de29");
    }

    #[test]
    fn test_serde_as_hex_string() {
        let fp = hash_blob(b"hello world");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"95d09f2b10159347eece71399a7e2e907ea3df4f\"");
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_different_data_different_fingerprint() {
        assert_ne!(hash_blob(b"hello"), hash_blob(b"world"));
    }
}
