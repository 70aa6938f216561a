//! Workspace persistence using sled
//!
//! Records are keyed by `(user, workspace id)`. Every successful write bumps
//! the workspace's revision, and writes that carry a stale revision are
//! rejected instead of silently overwriting a concurrent update.

use buildr_core::tree::FileNode;
use buildr_core::{FileContents, SyncedFileState, Workspace};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sled::Db;
use std::path::Path;
use tracing::{debug, info};
use ulid::Ulid;

use crate::error::{Result, StoreError};
use crate::pending::PendingJournal;
use crate::settings::UserSettings;

/// Key of a per-user record
pub(crate) fn record_key(user: &str, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user.len() + id.len() + 1);
    key.extend_from_slice(user.as_bytes());
    key.push(0);
    key.extend_from_slice(id.as_bytes());
    key
}

fn user_prefix(user: &str) -> Vec<u8> {
    let mut prefix = user.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn encode(workspace: &Workspace) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(workspace)?)
}

fn decode(bytes: &[u8]) -> Result<Workspace> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Listing entry for a stored workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
    pub github_repo: String,
    pub github_branch: String,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

impl From<&Workspace> for WorkspaceSummary {
    fn from(ws: &Workspace) -> Self {
        Self {
            id: ws.id.clone(),
            name: ws.name.clone(),
            github_repo: ws.github_repo.clone(),
            github_branch: ws.github_branch.clone(),
            revision: ws.revision,
            saved_at: ws.saved_at,
        }
    }
}

/// Durable store for workspaces, user settings, and pending publish runs
pub struct WorkspaceStore {
    /// Sled database
    db: Db,
    workspaces: sled::Tree,
    settings: sled::Tree,
    pending: PendingJournal,
    /// Serializes multi-record updates (settings + workspace)
    writer: Mutex<()>,
}

impl WorkspaceStore {
    /// Open or create a store in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("workspaces.db"))?;
        Self::from_db(db)
    }

    /// In-memory store that is discarded on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let workspaces = db.open_tree("workspaces")?;
        let settings = db.open_tree("settings")?;
        let pending = PendingJournal::new(db.open_tree("pending")?);
        Ok(Self {
            db,
            workspaces,
            settings,
            pending,
            writer: Mutex::new(()),
        })
    }

    /// Journal of unfinished publish runs
    pub fn pending(&self) -> &PendingJournal {
        &self.pending
    }

    /// Store a new workspace; assigns an id when empty
    ///
    /// The stored record starts at revision 1.
    pub fn create(&self, user: &str, mut workspace: Workspace) -> Result<Workspace> {
        if workspace.id.is_empty() {
            workspace.id = Ulid::new().to_string();
        }
        workspace.revision = 1;
        workspace.saved_at = Utc::now();

        let key = record_key(user, &workspace.id);
        let swapped = self
            .workspaces
            .compare_and_swap(&key, None::<&[u8]>, Some(encode(&workspace)?))?;
        if swapped.is_err() {
            return Err(StoreError::AlreadyExists(workspace.id));
        }
        self.db.flush()?;

        info!("Created workspace {} ({})", workspace.id, workspace.github_repo);
        Ok(workspace)
    }

    /// Get a workspace by id
    pub fn get(&self, user: &str, id: &str) -> Result<Option<Workspace>> {
        match self.workspaces.get(record_key(user, id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a workspace by id, failing when it does not exist
    pub fn load(&self, user: &str, id: &str) -> Result<Workspace> {
        self.get(user, id)?
            .ok_or_else(|| StoreError::WorkspaceNotFound(id.to_string()))
    }

    /// Apply a change to a stored workspace if its revision still matches
    ///
    /// Returns the stored workspace with its new revision.
    pub fn update<F>(&self, user: &str, id: &str, expected_revision: u64, change: F) -> Result<Workspace>
    where
        F: FnOnce(&mut Workspace),
    {
        let key = record_key(user, id);
        let current = self
            .workspaces
            .get(&key)?
            .ok_or_else(|| StoreError::WorkspaceNotFound(id.to_string()))?;

        let mut workspace = decode(&current)?;
        if workspace.revision != expected_revision {
            return Err(StoreError::RevisionConflict {
                id: id.to_string(),
                expected: expected_revision,
                actual: workspace.revision,
            });
        }

        change(&mut workspace);
        workspace.id = id.to_string();
        workspace.revision = expected_revision + 1;
        workspace.saved_at = Utc::now();

        let swapped = self
            .workspaces
            .compare_and_swap(&key, Some(&current), Some(encode(&workspace)?))?;
        if let Err(cas) = swapped {
            // Lost the race between read and swap
            let actual = match cas.current {
                Some(bytes) => decode(&bytes)?.revision,
                None => return Err(StoreError::WorkspaceNotFound(id.to_string())),
            };
            return Err(StoreError::RevisionConflict {
                id: id.to_string(),
                expected: expected_revision,
                actual,
            });
        }
        self.db.flush()?;

        debug!("Workspace {} now at revision {}", id, workspace.revision);
        Ok(workspace)
    }

    /// Write back a whole workspace that was read at `workspace.revision`
    pub fn save(&self, user: &str, workspace: &Workspace) -> Result<Workspace> {
        self.update(user, &workspace.id, workspace.revision, |stored| {
            *stored = workspace.clone();
        })
    }

    /// Replace the synced fingerprint map after a successful publish
    pub fn replace_synced_state(
        &self,
        user: &str,
        id: &str,
        expected_revision: u64,
        synced: SyncedFileState,
    ) -> Result<Workspace> {
        self.update(user, id, expected_revision, |ws| {
            ws.replace_synced_state(synced);
        })
    }

    /// Persist editor state; image contents are dropped
    pub fn save_editor_state(
        &self,
        user: &str,
        id: &str,
        expected_revision: u64,
        tree: Vec<FileNode>,
        contents: FileContents,
        active_file: Option<String>,
    ) -> Result<Workspace> {
        self.update(user, id, expected_revision, |ws| {
            ws.apply_editor_state(tree, contents, active_file);
        })
    }

    /// All workspaces of a user, most recently saved first
    pub fn list(&self, user: &str) -> Result<Vec<WorkspaceSummary>> {
        let mut summaries = Vec::new();
        for item in self.workspaces.scan_prefix(user_prefix(user)) {
            let (_, value) = item?;
            summaries.push(WorkspaceSummary::from(&decode(&value)?));
        }
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    /// Delete a workspace, its pending run, and its active marker
    pub fn delete(&self, user: &str, id: &str) -> Result<bool> {
        let _guard = self.writer.lock();

        let removed = self.workspaces.remove(record_key(user, id))?.is_some();
        if !removed {
            return Ok(false);
        }
        self.pending.finish(user, id)?;

        let mut settings = self.load_settings(user)?;
        if settings.active_workspace_id.as_deref() == Some(id) {
            settings.active_workspace_id = None;
            self.store_settings(user, &settings)?;
        }
        self.db.flush()?;

        info!("Deleted workspace {}", id);
        Ok(true)
    }

    /// Settings of a user (defaults when never saved)
    pub fn settings(&self, user: &str) -> Result<UserSettings> {
        self.load_settings(user)
    }

    /// Overwrite the settings of a user
    pub fn put_settings(&self, user: &str, settings: &UserSettings) -> Result<()> {
        let _guard = self.writer.lock();
        self.store_settings(user, settings)?;
        self.db.flush()?;
        Ok(())
    }

    /// Mark a workspace as the user's active one
    pub fn set_active(&self, user: &str, id: &str) -> Result<UserSettings> {
        let _guard = self.writer.lock();

        if !self.workspaces.contains_key(record_key(user, id))? {
            return Err(StoreError::WorkspaceNotFound(id.to_string()));
        }
        let mut settings = self.load_settings(user)?;
        settings.active_workspace_id = Some(id.to_string());
        self.store_settings(user, &settings)?;
        self.db.flush()?;
        Ok(settings)
    }

    /// The user's active workspace, if one is set and still exists
    pub fn active(&self, user: &str) -> Result<Option<Workspace>> {
        match self.load_settings(user)?.active_workspace_id {
            Some(id) => self.get(user, &id),
            None => Ok(None),
        }
    }

    fn load_settings(&self, user: &str) -> Result<UserSettings> {
        match self.settings.get(user.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(UserSettings::default()),
        }
    }

    fn store_settings(&self, user: &str, settings: &UserSettings) -> Result<()> {
        self.settings
            .insert(user.as_bytes(), serde_json::to_vec(settings)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildr_core::tree::{EntryKind, build};
    use buildr_core::{Snapshot, SyncTarget, hash_blob};
    use tempfile::TempDir;

    fn workspace(id: &str) -> Workspace {
        let target = SyncTarget::new("octo/site", "main").unwrap();
        let mut contents = FileContents::new();
        contents.insert("index.html".into(), "<h1>hi</h1>".into());
        let mut fingerprints = SyncedFileState::new();
        fingerprints.insert("index.html".into(), hash_blob(b"<h1>hi</h1>"));
        let snapshot = Snapshot {
            tree: build([("index.html", EntryKind::Blob)]),
            contents,
            fingerprints,
        };
        Workspace::from_snapshot(id, &target, snapshot)
    }

    #[test]
    fn test_create_and_load() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let created = store.create("alice", workspace("ws-1"))?;
        assert_eq!(created.revision, 1);

        let loaded = store.load("alice", "ws-1")?;
        assert_eq!(loaded, created);
        assert!(store.get("bob", "ws-1")?.is_none());
        assert!(matches!(
            store.load("alice", "missing"),
            Err(StoreError::WorkspaceNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_create_assigns_id_and_rejects_duplicates() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let created = store.create("alice", workspace(""))?;
        assert_eq!(created.id.len(), 26);

        store.create("alice", workspace("ws-1"))?;
        assert!(matches!(
            store.create("alice", workspace("ws-1")),
            Err(StoreError::AlreadyExists(_))
        ));
        Ok(())
    }

    #[test]
    fn test_replace_synced_state_bumps_revision() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let created = store.create("alice", workspace("ws-1"))?;

        let mut synced = SyncedFileState::new();
        synced.insert("a.md".into(), hash_blob(b"A"));
        let updated = store.replace_synced_state("alice", "ws-1", created.revision, synced.clone())?;
        assert_eq!(updated.revision, 2);
        assert_eq!(store.load("alice", "ws-1")?.synced_file_state, synced);
        Ok(())
    }

    #[test]
    fn test_stale_revision_is_rejected() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let created = store.create("alice", workspace("ws-1"))?;

        // Another writer saves first
        let mut other = created.clone();
        other.write_file("b.md", "B").unwrap();
        store.save("alice", &other)?;

        let result = store.replace_synced_state("alice", "ws-1", created.revision, SyncedFileState::new());
        match result {
            Err(StoreError::RevisionConflict { expected, actual, .. }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected revision conflict, got {:?}", other),
        }

        // The concurrent write was not overwritten
        let stored = store.load("alice", "ws-1")?;
        assert!(stored.file_contents.contains_key("b.md"));
        assert_eq!(stored.synced_file_state.len(), 1);
        Ok(())
    }

    #[test]
    fn test_save_editor_state_filters_images() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let created = store.create("alice", workspace("ws-1"))?;

        let mut contents = FileContents::new();
        contents.insert("index.html".into(), "new".into());
        contents.insert("assets/images/a.png".into(), "data:image/png;base64,AAAA".into());
        let tree = build([
            ("index.html", EntryKind::Blob),
            ("assets/images/a.png", EntryKind::Blob),
        ]);

        let saved = store.save_editor_state(
            "alice",
            "ws-1",
            created.revision,
            tree,
            contents,
            Some("index.html".into()),
        )?;
        assert_eq!(saved.file_contents.len(), 1);
        assert_eq!(saved.file_contents["index.html"], "new");
        Ok(())
    }

    #[test]
    fn test_list_active_and_delete() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        store.create("alice", workspace("ws-1"))?;
        store.create("alice", workspace("ws-2"))?;
        store.create("bob", workspace("ws-3"))?;

        let listed = store.list("alice")?;
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.id != "ws-3"));

        assert!(store.active("alice")?.is_none());
        store.set_active("alice", "ws-2")?;
        assert_eq!(store.active("alice")?.map(|w| w.id), Some("ws-2".to_string()));
        assert!(matches!(
            store.set_active("alice", "ws-3"),
            Err(StoreError::WorkspaceNotFound(_))
        ));

        store.pending().begin("alice", "ws-2")?;
        assert!(store.delete("alice", "ws-2")?);
        assert!(!store.delete("alice", "ws-2")?);
        assert!(store.settings("alice")?.active_workspace_id.is_none());
        assert!(store.pending().get("alice", "ws-2")?.is_none());
        assert_eq!(store.list("alice")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_persists_across_reopen() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = WorkspaceStore::open(temp_dir.path())?;
            store.create("alice", workspace("ws-1"))?;
            store.put_settings(
                "alice",
                &UserSettings {
                    github_repo: Some("octo/site".into()),
                    github_branch: Some("main".into()),
                    installation_id: Some(7),
                    ..Default::default()
                },
            )?;
        }

        let store = WorkspaceStore::open(temp_dir.path())?;
        let loaded = store.load("alice", "ws-1")?;
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.synced_file_state.len(), 1);
        assert_eq!(store.settings("alice")?.installation_id, Some(7));
        Ok(())
    }
}
