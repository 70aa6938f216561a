//! Pending-sync journal
//!
//! A publish is a sequence of remote writes with no rollback. Each completed
//! write is recorded here under the run that performed it; when a run is
//! interrupted, the next publish of the same workspace resumes the run and
//! skips what was already applied. The run is closed once the refreshed
//! fingerprints have been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use ulid::Ulid;

use crate::error::Result;
use crate::store::record_key;

/// One publish run that has not finished yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRun {
    pub run_id: Ulid,
    pub workspace_id: String,
    pub started_at: DateTime<Utc>,
    /// Operation keys already applied to the remote
    pub completed: BTreeSet<String>,
}

impl PendingRun {
    fn new(workspace_id: &str) -> Self {
        Self {
            run_id: Ulid::new(),
            workspace_id: workspace_id.to_string(),
            started_at: Utc::now(),
            completed: BTreeSet::new(),
        }
    }

    pub fn is_done(&self, op: &str) -> bool {
        self.completed.contains(op)
    }

    /// Whether this run was started by an earlier, interrupted publish
    pub fn is_resumed(&self) -> bool {
        !self.completed.is_empty()
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Journal of unfinished publish runs, one per workspace
#[derive(Clone)]
pub struct PendingJournal {
    tree: sled::Tree,
}

impl PendingJournal {
    pub(crate) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    /// Resume the unfinished run for a workspace, or start a new one
    pub fn begin(&self, user: &str, workspace_id: &str) -> Result<PendingRun> {
        if let Some(run) = self.get(user, workspace_id)? {
            info!(
                "Resuming publish run {} ({} operations already applied)",
                run.run_id,
                run.completed.len()
            );
            return Ok(run);
        }

        let run = PendingRun::new(workspace_id);
        self.tree
            .insert(record_key(user, workspace_id), run.to_bytes()?)?;
        self.tree.flush()?;
        debug!("Started publish run {}", run.run_id);
        Ok(run)
    }

    /// The unfinished run for a workspace, if any
    pub fn get(&self, user: &str, workspace_id: &str) -> Result<Option<PendingRun>> {
        match self.tree.get(record_key(user, workspace_id))? {
            Some(bytes) => Ok(Some(PendingRun::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Record that an operation reached the remote
    pub fn record(&self, user: &str, run: &mut PendingRun, op: impl Into<String>) -> Result<()> {
        run.completed.insert(op.into());
        self.tree
            .insert(record_key(user, &run.workspace_id), run.to_bytes()?)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Close the run for a workspace; returns whether one was open
    pub fn finish(&self, user: &str, workspace_id: &str) -> Result<bool> {
        let removed = self.tree.remove(record_key(user, workspace_id))?.is_some();
        if removed {
            self.tree.flush()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WorkspaceStore;
    use tempfile::TempDir;

    #[test]
    fn test_begin_record_resume_finish() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let run_id;
        {
            let store = WorkspaceStore::open(temp_dir.path())?;
            let journal = store.pending();
            let mut run = journal.begin("alice", "ws-1")?;
            assert!(!run.is_resumed());
            run_id = run.run_id;

            journal.record("alice", &mut run, "delete:old.md")?;
            journal.record("alice", &mut run, "upsert:a.md")?;
        }

        // Reopen: the run survives and is resumed
        let store = WorkspaceStore::open(temp_dir.path())?;
        let journal = store.pending();
        let run = journal.begin("alice", "ws-1")?;
        assert_eq!(run.run_id, run_id);
        assert!(run.is_resumed());
        assert!(run.is_done("delete:old.md"));
        assert!(run.is_done("upsert:a.md"));
        assert!(!run.is_done("upsert:b.md"));

        assert!(journal.finish("alice", "ws-1")?);
        assert!(!journal.finish("alice", "ws-1")?);
        assert!(journal.get("alice", "ws-1")?.is_none());

        let fresh = journal.begin("alice", "ws-1")?;
        assert_ne!(fresh.run_id, run_id);
        Ok(())
    }

    #[test]
    fn test_runs_are_per_user_and_workspace() -> Result<()> {
        let store = WorkspaceStore::temporary()?;
        let journal = store.pending();

        let mut a = journal.begin("alice", "ws-1")?;
        journal.record("alice", &mut a, "upsert:x.md")?;

        assert!(journal.get("bob", "ws-1")?.is_none());
        assert!(journal.get("alice", "ws-2")?.is_none());
        Ok(())
    }
}
