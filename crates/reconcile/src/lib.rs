//! Reconciliation between a workspace and its last synced state
//!
//! This crate provides:
//! - Gitignore-style ignore rules compiled from workspace content
//! - The snapshot differ (delete set + upsert set)

pub mod diff;
pub mod ignore;

// Re-exports
pub use diff::{FileEntry, SnapshotDiff, diff};
pub use ignore::{IgnoreConfig, IgnoreRules};
