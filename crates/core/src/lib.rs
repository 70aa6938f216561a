//! Core types for the buildr sync engine
//!
//! This crate provides:
//! - Git blob fingerprints (SHA-1)
//! - The workspace `FileNode` tree and the path-to-tree builder
//! - Image-asset policy
//! - File payloads (text and data-URL binary)
//! - The `Workspace` aggregate
//! - The error taxonomy shared by every sync operation

pub mod assets;
pub mod error;
pub mod hash;
pub mod payload;
pub mod tree;
pub mod workspace;

// Re-exports
pub use assets::is_image_path;
pub use error::SyncError;
pub use hash::{Fingerprint, hash_blob};
pub use payload::FilePayload;
pub use tree::{EntryKind, FileNode, NodeKind, TreeBuilder};
pub use workspace::{FileContents, Snapshot, SyncTarget, SyncedFileState, Workspace};

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
