//! Store errors

use buildr_core::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer advanced the workspace since it was read
    #[error("Workspace {id} was modified concurrently (expected revision {expected}, found {actual})")]
    RevisionConflict { id: String, expected: u64, actual: u64 },

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Workspace already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Record encoding error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
