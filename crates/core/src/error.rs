//! Error taxonomy shared by the sync engine

/// Errors surfaced by clone, diff, and publish operations
///
/// Messages are passed through to the caller unmodified, so they are written
/// for a human reader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Required remote linkage (repo, branch, installation) is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote file moved since the last sync
    #[error("Fingerprint mismatch for {path}: the file changed on the remote since the last sync")]
    FingerprintMismatch { path: String },

    /// An upsert entry had no resolvable content
    #[error("No content available for {path}")]
    ContentResolution { path: String },

    /// An asset is over the remote's size ceiling even after compression
    #[error("{path} is too large to publish ({size} bytes, limit {limit} bytes). Please use a smaller file.")]
    SizeLimit { path: String, size: usize, limit: usize },

    /// Remote unreachable, timed out, or answered with an unexpected status
    #[error("Remote request failed: {0}")]
    Transport(String),

    /// Credentials rejected by the remote
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Remote object or path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persistence collaborator failed
    #[error("Store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Whether this failure only affects a single item of a batch
    ///
    /// Deletes that hit these are reported and the batch continues.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(self, Self::FingerprintMismatch { .. } | Self::NotFound(_))
    }

    /// Shorthand for a missing-linkage error
    pub fn missing(what: &str) -> Self {
        Self::Configuration(format!(
            "{} is not configured. Please check your settings.",
            what
        ))
    }
}
