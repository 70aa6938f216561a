//! Remote repository contract
//!
//! The sync engine treats the Git host as an opaque tree/blob/commit service.
//! Every call is one awaited request; callers sequence them.

use async_trait::async_trait;
use buildr_core::{EntryKind, FilePayload, Fingerprint, Result};

/// Placeholder committed to materialize an otherwise-empty directory
pub use buildr_core::tree::KEEP_FILE;

/// One entry of a recursive branch listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub path: String,
    pub kind: EntryKind,
    /// Object id (the blob fingerprint for files)
    pub sha: Fingerprint,
}

impl TreeItem {
    pub fn blob(path: impl Into<String>, sha: Fingerprint) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
            sha,
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// Git hosting operations used by clone, publish, and pull requests
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Recursive listing of a branch, files and directories
    async fn list_tree(&self, repo: &str, branch: &str) -> Result<Vec<TreeItem>>;

    /// Raw bytes of a blob
    async fn get_blob(&self, repo: &str, sha: &Fingerprint) -> Result<Vec<u8>>;

    /// Create or replace one file in its own commit; returns the new blob id
    async fn put_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        body: &FilePayload,
        message: &str,
    ) -> Result<Fingerprint>;

    /// Delete one file in its own commit
    ///
    /// Fails with `SyncError::FingerprintMismatch` when the remote blob is no
    /// longer `expected`.
    async fn delete_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        expected: &Fingerprint,
        message: &str,
    ) -> Result<()>;

    /// Make sure a directory exists (idempotent)
    async fn ensure_directory(&self, repo: &str, branch: &str, path: &str) -> Result<()>;

    /// Commit sha at the head of a branch
    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String>;

    /// Create a branch pointing at a commit
    async fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()>;

    /// Open a pull request; returns its web URL
    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String>;
}

/// Commit message for an updated file
pub fn update_message(name: &str) -> String {
    format!("buildr: update {}", name)
}

/// Commit message for a deleted file
pub fn delete_message(path: &str) -> String {
    format!("buildr: delete {}", path)
}
