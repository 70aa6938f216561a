//! The workspace aggregate: tree, contents, and the synced baseline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assets::is_image_path;
use crate::error::SyncError;
use crate::hash::Fingerprint;
use crate::tree::{self, FileNode, KEEP_FILE, NodeKind};

/// path -> decoded text content
pub type FileContents = BTreeMap<String, String>;

/// path -> remote fingerprint of the last version known to be committed
pub type SyncedFileState = BTreeMap<String, Fingerprint>;

/// File opened by default after a clone
pub const DEFAULT_ACTIVE_FILE: &str = "index.html";

/// Remote repository and branch a workspace publishes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    /// `owner/name`
    pub repo: String,
    pub branch: String,
}

impl SyncTarget {
    /// Validate and build a target; both parts are required
    pub fn new(repo: impl Into<String>, branch: impl Into<String>) -> Result<Self, SyncError> {
        let repo = repo.into();
        let branch = branch.into();
        if repo.trim().is_empty() {
            return Err(SyncError::missing("GitHub repository"));
        }
        if !repo.contains('/') {
            return Err(SyncError::Configuration(format!(
                "GitHub repository '{}' must be in owner/name form",
                repo
            )));
        }
        if branch.trim().is_empty() {
            return Err(SyncError::missing("GitHub branch"));
        }
        Ok(Self { repo, branch })
    }

    /// Repository name without the owner
    pub fn repo_name(&self) -> &str {
        self.repo.rsplit('/').next().unwrap_or(&self.repo)
    }
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.repo, self.branch)
    }
}

/// Everything the importer derives from a remote branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub tree: Vec<FileNode>,
    pub contents: FileContents,
    pub fingerprints: SyncedFileState,
}

/// Aggregate root owned by one user's storage record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub github_repo: String,
    pub github_branch: String,
    pub file_structure: Vec<FileNode>,
    pub file_contents: FileContents,
    pub synced_file_state: SyncedFileState,
    pub active_file: Option<String>,
    /// Bumped by the store on every successful write
    #[serde(default)]
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

impl Workspace {
    /// Create a workspace seeded from an imported snapshot
    pub fn from_snapshot(id: impl Into<String>, target: &SyncTarget, snapshot: Snapshot) -> Self {
        Self {
            id: id.into(),
            name: target.repo_name().to_string(),
            github_repo: target.repo.clone(),
            github_branch: target.branch.clone(),
            file_structure: snapshot.tree,
            file_contents: snapshot.contents,
            synced_file_state: snapshot.fingerprints,
            active_file: Some(DEFAULT_ACTIVE_FILE.to_string()),
            revision: 0,
            saved_at: Utc::now(),
        }
    }

    /// Remote linkage of this workspace
    pub fn target(&self) -> Result<SyncTarget, SyncError> {
        SyncTarget::new(self.github_repo.clone(), self.github_branch.clone())
    }

    /// Overwrite tree, contents, and baseline with a fresh snapshot
    ///
    /// Used by force re-clone: local edits are discarded.
    pub fn reset_to(&mut self, snapshot: Snapshot) {
        self.file_structure = snapshot.tree;
        self.file_contents = snapshot.contents;
        self.synced_file_state = snapshot.fingerprints;
        self.active_file = Some(DEFAULT_ACTIVE_FILE.to_string());
        self.saved_at = Utc::now();
    }

    /// Replace editor state; image contents are never stored
    pub fn apply_editor_state(
        &mut self,
        tree: Vec<FileNode>,
        contents: FileContents,
        active_file: Option<String>,
    ) {
        self.file_structure = tree;
        self.file_contents = contents
            .into_iter()
            .filter(|(path, _)| !is_image_path(path))
            .collect();
        self.active_file = active_file;
        self.saved_at = Utc::now();
    }

    /// Create or update a text file
    pub fn write_file(&mut self, path: &str, content: impl Into<String>) -> Result<(), SyncError> {
        if is_image_path(path) {
            return Err(SyncError::Configuration(format!(
                "{} is an image; images are uploaded directly, not edited in the workspace",
                path
            )));
        }
        if !tree::insert_path(&mut self.file_structure, path, NodeKind::File) {
            return Err(SyncError::Configuration(format!(
                "cannot create {}: a parent path is a file",
                path
            )));
        }
        self.file_contents.insert(path.to_string(), content.into());
        self.saved_at = Utc::now();
        Ok(())
    }

    /// Create an (initially empty) folder
    pub fn create_folder(&mut self, path: &str) -> Result<(), SyncError> {
        if !tree::insert_path(&mut self.file_structure, path, NodeKind::Folder) {
            return Err(SyncError::Configuration(format!(
                "cannot create {}: a parent path is a file",
                path
            )));
        }
        self.saved_at = Utc::now();
        Ok(())
    }

    /// Remove a file or folder and any contents under it
    pub fn remove_path(&mut self, path: &str) -> bool {
        let removed = tree::remove_path(&mut self.file_structure, path).is_some();
        if removed {
            let prefix = format!("{}/", path);
            self.file_contents
                .retain(|p, _| p != path && !p.starts_with(&prefix));
            if self.active_file.as_deref() == Some(path) {
                self.active_file = None;
            }
            self.saved_at = Utc::now();
        }
        removed
    }

    /// Replace the synced baseline after a publish
    ///
    /// Directories the remote holds only as a keep-file are adopted into the
    /// tree, so the next diff does not delete them again.
    pub fn replace_synced_state(&mut self, synced: SyncedFileState) {
        for path in synced.keys() {
            let Some(dir) = path.strip_suffix(KEEP_FILE).and_then(|p| p.strip_suffix('/')) else {
                continue;
            };
            if tree::find(&self.file_structure, dir).is_none() {
                tree::insert_path(&mut self.file_structure, dir, NodeKind::Folder);
            }
        }
        self.synced_file_state = synced;
    }

    /// Content of the workspace's ignore file, if any
    pub fn gitignore(&self) -> Option<&str> {
        self.file_contents.get(".gitignore").map(String::as_str)
    }
}
