//! File payloads as they travel to the remote
//!
//! Workspace content is text. A value written as a data URL
//! (`data:<mime>;base64,<payload>`) carries binary content that was inlined
//! by the editor, and is transferred as raw bytes instead of text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::SyncError;
use crate::hash::{Fingerprint, hash_blob};

/// Content of one file to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePayload {
    Text(String),
    Binary(Vec<u8>),
}

impl FilePayload {
    /// Interpret raw workspace content, decoding data URLs
    pub fn from_content(path: &str, raw: &str) -> Result<Self, SyncError> {
        if !raw.starts_with("data:") {
            return Ok(Self::Text(raw.to_string()));
        }

        let (_, encoded) = raw.split_once(',').ok_or_else(|| {
            SyncError::Decode(format!("{}: data URL has no payload separator", path))
        })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SyncError::Decode(format!("{}: invalid base64 payload: {}", path, e)))?;
        Ok(Self::Binary(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Git blob id this payload will have once committed
    pub fn fingerprint(&self) -> Fingerprint {
        hash_blob(self.as_bytes())
    }

    /// Base64 form used by the contents API
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }
}

/// Decode a base64 blob body as reported by the remote (may contain newlines)
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, SyncError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| SyncError::Decode(format!("invalid base64 blob: {}", e)))
}

/// Extract the MIME type from a data URL, if it is one
pub fn data_url_mime(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("data:")?;
    let (meta, _) = rest.split_once(',')?;
    Some(meta.split(';').next().unwrap_or(meta))
}
