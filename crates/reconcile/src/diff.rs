//! Snapshot differ
//!
//! Compares the current workspace tree with the fingerprints recorded at the
//! last successful sync and produces the set of remote deletes and the set of
//! file upserts needed to make the remote match the workspace.

use std::collections::HashSet;

use buildr_core::tree::{self, FileNode};
use buildr_core::{FileContents, FilePayload, Fingerprint, SyncError, SyncedFileState, is_image_path};
use tracing::{debug, warn};

use crate::ignore::IgnoreRules;

/// One file to create or update on the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub payload: FilePayload,
    /// Fingerprint at the last sync, if the file existed then
    pub previous: Option<Fingerprint>,
}

impl FileEntry {
    pub fn is_new(&self) -> bool {
        self.previous.is_none()
    }
}

/// Result of comparing the workspace with its last synced state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Paths to delete remotely with their last-known fingerprint
    pub to_delete: Vec<(String, Fingerprint)>,
    /// Files to write, depth-first tree order
    pub to_upsert: Vec<FileEntry>,
    /// Upserts dropped because no content could be resolved, with the reason
    pub skipped: Vec<(String, SyncError)>,
    /// Files whose content matches the synced fingerprint
    pub unchanged: usize,
}

impl SnapshotDiff {
    /// True when publishing would not touch the remote
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_upsert.is_empty()
    }

    /// Number of remote operations
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_upsert.len()
    }

    /// Upserts for paths that did not exist at the last sync
    pub fn added(&self) -> impl Iterator<Item = &FileEntry> {
        self.to_upsert.iter().filter(|e| e.is_new())
    }

    /// Upserts replacing a previously synced version
    pub fn modified(&self) -> impl Iterator<Item = &FileEntry> {
        self.to_upsert.iter().filter(|e| !e.is_new())
    }
}

/// Compute the delete and upsert sets
///
/// Neither set ever contains an ignored or image path. A path absent from
/// the workspace but matched by the ignore rules is left alone on the remote.
pub fn diff(
    previous: &SyncedFileState,
    current: &[FileNode],
    contents: &FileContents,
    rules: &IgnoreRules,
) -> SnapshotDiff {
    let files = tree::collect_files(current);

    // Every path the workspace still has: files, folders, and placeholders
    let mut present: HashSet<String> = tree::all_paths(current);
    present.extend(files.iter().map(|f| f.path.clone()));

    let mut result = SnapshotDiff::default();

    for (path, fingerprint) in previous {
        if present.contains(path) || rules.is_ignored(path) || is_image_path(path) {
            continue;
        }
        result.to_delete.push((path.clone(), *fingerprint));
    }

    for file in files {
        if rules.is_ignored(&file.path) || is_image_path(&file.path) {
            continue;
        }

        let raw = match contents.get(&file.path).or(file.content.as_ref()) {
            Some(raw) => raw,
            None => {
                let err = SyncError::ContentResolution { path: file.path.clone() };
                warn!("Skipping upsert: {}", err);
                result.skipped.push((file.path, err));
                continue;
            }
        };

        let payload = match FilePayload::from_content(&file.path, raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping {}: {}", file.path, e);
                result.skipped.push((file.path, e));
                continue;
            }
        };

        let synced = previous.get(&file.path).copied();
        if synced == Some(payload.fingerprint()) {
            result.unchanged += 1;
            continue;
        }

        result.to_upsert.push(FileEntry {
            path: file.path,
            name: file.name,
            payload,
            previous: synced,
        });
    }

    debug!(
        "Diff: {} to delete, {} to upsert, {} unchanged, {} skipped",
        result.to_delete.len(),
        result.to_upsert.len(),
        result.unchanged,
        result.skipped.len()
    );

    result
}
