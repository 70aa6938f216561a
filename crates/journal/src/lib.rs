//! Workspace persistence
//!
//! This crate provides:
//! - Workspace records keyed by user (sled embedded DB)
//! - Revision-checked writes (compare-and-swap)
//! - Per-user settings (remote linkage, active workspace)
//! - The pending-sync journal used to resume interrupted publishes

pub mod error;
pub mod pending;
pub mod settings;
pub mod store;

// Re-exports
pub use error::{Result, StoreError};
pub use pending::{PendingJournal, PendingRun};
pub use settings::UserSettings;
pub use store::{WorkspaceStore, WorkspaceSummary};
