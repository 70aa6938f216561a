//! Apply a snapshot diff to the remote
//!
//! The protocol is strictly ordered, each step finishing before the next:
//! 1. Ensure the configured directories exist
//! 2. Apply deletes (fingerprint-checked)
//! 3. Apply upserts, one commit per file
//! 4. Re-import the branch to obtain the new fingerprint map
//!
//! There is no rollback. Completed writes are recorded in the pending-sync
//! journal, so re-running an interrupted publish skips what already landed.

use buildr_core::{Fingerprint, Result, SyncError, SyncTarget, SyncedFileState, Workspace};
use journal::{PendingJournal, PendingRun, WorkspaceStore};
use reconcile::{IgnoreConfig, IgnoreRules, SnapshotDiff, diff};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::import::import_all;
use crate::repository::{RemoteRepository, delete_message, update_message};

/// Directories every site needs before posts can be committed
pub const DEFAULT_REQUIRED_DIRS: &[&str] = &["_posts", "assets/images"];

/// Largest binary payload committed through the contents API (0.8 MiB)
pub const DEFAULT_MAX_ASSET_BYTES: usize = 838_860;

/// Publish behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directories ensured before any write
    #[serde(default = "default_required_dirs")]
    pub required_dirs: Vec<String>,

    /// Binary upserts larger than this fail the publish
    #[serde(default = "default_max_asset_bytes")]
    pub max_asset_bytes: usize,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

fn default_required_dirs() -> Vec<String> {
    DEFAULT_REQUIRED_DIRS.iter().map(|d| d.to_string()).collect()
}

fn default_max_asset_bytes() -> usize {
    DEFAULT_MAX_ASSET_BYTES
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            required_dirs: default_required_dirs(),
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            ignore: IgnoreConfig::default(),
        }
    }
}

/// Outcome of one publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub deleted: Vec<String>,
    pub upserted: Vec<String>,
    /// Per-item failures that did not abort the publish
    pub failed: Vec<(String, SyncError)>,
    /// Upserts the differ dropped for lack of content, with the reason
    pub skipped: Vec<(String, SyncError)>,
    /// Operations skipped because an interrupted run already applied them
    pub resumed: usize,
    /// Fingerprints re-derived from the remote after publishing
    pub fingerprints: SyncedFileState,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

fn delete_op(path: &str) -> String {
    format!("delete:{}", path)
}

fn upsert_op(path: &str, fingerprint: &Fingerprint) -> String {
    format!("upsert:{}:{}", path, fingerprint)
}

struct RunJournal<'a> {
    journal: &'a PendingJournal,
    user: String,
    run: PendingRun,
}

/// Executes a diff against one remote branch
pub struct Publisher<'a, R: RemoteRepository + ?Sized> {
    remote: &'a R,
    target: SyncTarget,
    config: SyncConfig,
    journal: Option<RunJournal<'a>>,
    progress: Option<Box<dyn Fn(&str) + Send + Sync + 'a>>,
}

impl<'a, R: RemoteRepository + ?Sized> Publisher<'a, R> {
    pub fn new(remote: &'a R, target: SyncTarget) -> Self {
        Self {
            remote,
            target,
            config: SyncConfig::default(),
            journal: None,
            progress: None,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Record completed writes under `run` and skip those it already holds
    pub fn with_journal(mut self, journal: &'a PendingJournal, user: &str, run: PendingRun) -> Self {
        self.journal = Some(RunJournal {
            journal,
            user: user.to_string(),
            run,
        });
        self
    }

    /// Called with a short description before each remote write
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    fn report_progress(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }

    fn already_applied(&self, op: &str) -> bool {
        self.journal.as_ref().is_some_and(|j| j.run.is_done(op))
    }

    fn record(&mut self, op: String) -> Result<()> {
        if let Some(j) = self.journal.as_mut() {
            j.journal.record(&j.user, &mut j.run, op)?;
        }
        Ok(())
    }

    /// Apply `diff` to the remote and return the refreshed fingerprints
    pub async fn publish(&mut self, diff: &SnapshotDiff) -> Result<PublishReport> {
        let repo = self.target.repo.clone();
        let branch = self.target.branch.clone();
        let mut report = PublishReport {
            skipped: diff.skipped.clone(),
            ..Default::default()
        };

        // Nothing is written when an asset cannot be committed
        for entry in &diff.to_upsert {
            if entry.payload.is_binary() && entry.payload.len() > self.config.max_asset_bytes {
                return Err(SyncError::SizeLimit {
                    path: entry.path.clone(),
                    size: entry.payload.len(),
                    limit: self.config.max_asset_bytes,
                });
            }
        }

        info!(
            "Publishing to {}: {} deletes, {} upserts",
            self.target,
            diff.to_delete.len(),
            diff.to_upsert.len()
        );

        // 1. Directories. One that receives upserts is created by them.
        for dir in &self.config.required_dirs {
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            if diff.to_upsert.iter().any(|e| e.path.starts_with(&prefix)) {
                debug!("{} will be created by its upserts", dir);
                continue;
            }
            self.remote.ensure_directory(&repo, &branch, dir).await?;
        }

        // 2. Deletes
        for (path, fingerprint) in &diff.to_delete {
            let op = delete_op(path);
            if self.already_applied(&op) {
                report.resumed += 1;
                continue;
            }
            self.report_progress(&format!("delete {}", path));
            match self
                .remote
                .delete_file(&repo, &branch, path, fingerprint, &delete_message(path))
                .await
            {
                Ok(()) => {
                    report.deleted.push(path.clone());
                    self.record(op)?;
                }
                Err(e) if e.is_item_recoverable() => {
                    warn!("Delete of {} failed: {}", path, e);
                    report.failed.push((path.clone(), e));
                }
                Err(e) => return Err(e),
            }
        }

        // 3. Upserts
        for entry in &diff.to_upsert {
            let op = upsert_op(&entry.path, &entry.payload.fingerprint());
            if self.already_applied(&op) {
                report.resumed += 1;
                continue;
            }
            self.report_progress(&format!("update {}", entry.path));
            self.remote
                .put_file(&repo, &branch, &entry.path, &entry.payload, &update_message(&entry.name))
                .await?;
            report.upserted.push(entry.path.clone());
            self.record(op)?;
        }

        // 4. Refresh
        self.report_progress("refresh fingerprints");
        let snapshot = import_all(self.remote, &repo, &branch).await?;
        report.fingerprints = snapshot.fingerprints;

        info!(
            "Published {}: {} deleted, {} updated, {} failed, {} resumed",
            self.target,
            report.deleted.len(),
            report.upserted.len(),
            report.failed.len(),
            report.resumed
        );
        Ok(report)
    }
}

/// Clone, diff, and publish workspaces of one user
pub struct SyncService<'a, R: RemoteRepository + ?Sized> {
    remote: &'a R,
    store: &'a WorkspaceStore,
    user: String,
    config: SyncConfig,
}

impl<'a, R: RemoteRepository + ?Sized> SyncService<'a, R> {
    pub fn new(remote: &'a R, store: &'a WorkspaceStore, user: impl Into<String>) -> Self {
        Self {
            remote,
            store,
            user: user.into(),
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fail fast unless the user linked a GitHub App installation
    fn require_installation(&self) -> Result<u64> {
        Ok(self.store.settings(&self.user)?.installation()?)
    }

    /// Create a workspace from a remote branch and make it active
    pub async fn clone_workspace(&self, target: &SyncTarget) -> Result<Workspace> {
        self.require_installation()?;
        let snapshot = import_all(self.remote, &target.repo, &target.branch).await?;
        let workspace = Workspace::from_snapshot(String::new(), target, snapshot);
        let workspace = self.store.create(&self.user, workspace)?;
        self.store.set_active(&self.user, &workspace.id)?;
        Ok(workspace)
    }

    /// Overwrite a workspace with the remote branch, discarding local edits
    pub async fn force_reclone(&self, id: &str) -> Result<Workspace> {
        self.require_installation()?;
        let workspace = self.store.load(&self.user, id)?;
        let target = workspace.target()?;
        let snapshot = import_all(self.remote, &target.repo, &target.branch).await?;

        let workspace = self
            .store
            .update(&self.user, id, workspace.revision, |ws| ws.reset_to(snapshot))?;
        // A half-finished publish no longer describes this workspace
        self.store.pending().finish(&self.user, id)?;
        info!("Re-cloned workspace {} from {}", id, target);
        Ok(workspace)
    }

    /// What a publish of the workspace would do
    pub fn status(&self, id: &str) -> Result<SnapshotDiff> {
        let workspace = self.store.load(&self.user, id)?;
        self.diff_workspace(&workspace)
    }

    fn diff_workspace(&self, workspace: &Workspace) -> Result<SnapshotDiff> {
        let rules = IgnoreRules::from_contents(&workspace.file_contents, &self.config.ignore)?;
        Ok(diff(
            &workspace.synced_file_state,
            &workspace.file_structure,
            &workspace.file_contents,
            &rules,
        ))
    }

    /// Publish a workspace and persist the refreshed fingerprints
    ///
    /// The fingerprint write is rejected if the workspace changed during the
    /// publish; the remote is then already updated and the next publish
    /// reconciles against the newer revision.
    pub async fn publish_workspace(&self, id: &str) -> Result<PublishReport> {
        self.publish_with_progress(id, |_| {}).await
    }

    pub async fn publish_with_progress<F>(&self, id: &str, progress: F) -> Result<PublishReport>
    where
        F: Fn(&str) + Send + Sync + 'a,
    {
        self.require_installation()?;
        let workspace = self.store.load(&self.user, id)?;
        let target = workspace.target()?;
        let diff = self.diff_workspace(&workspace)?;

        if diff.is_empty() && self.store.pending().get(&self.user, id)?.is_none() {
            info!("Workspace {} is in sync with {}", id, target);
            return Ok(PublishReport {
                skipped: diff.skipped,
                fingerprints: workspace.synced_file_state,
                ..Default::default()
            });
        }

        let run = self.store.pending().begin(&self.user, id)?;
        let mut publisher = Publisher::new(self.remote, target)
            .with_config(self.config.clone())
            .with_journal(self.store.pending(), &self.user, run)
            .with_progress(progress);
        let report = publisher.publish(&diff).await?;

        self.store.replace_synced_state(
            &self.user,
            id,
            workspace.revision,
            report.fingerprints.clone(),
        )?;
        self.store.pending().finish(&self.user, id)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.required_dirs, vec!["_posts", "assets/images"]);
        assert_eq!(config.max_asset_bytes, 838_860);
    }

    #[test]
    fn test_op_keys_include_content() {
        let a = buildr_core::hash_blob(b"a");
        let b = buildr_core::hash_blob(b"b");
        assert_ne!(upsert_op("x.md", &a), upsert_op("x.md", &b));
        assert_eq!(delete_op("x.md"), "delete:x.md");
    }
}
