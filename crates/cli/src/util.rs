//! Shared utilities for CLI commands

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use buildr_core::{SyncTarget, Workspace};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use journal::WorkspaceStore;
use reconcile::{IgnoreRules, SnapshotDiff};
use remote::{GithubClient, SyncService};
use std::path::PathBuf;
use std::time::Duration;

/// Overrides where workspaces and locks are kept
pub const DATA_DIR_ENV: &str = "BUILDR_DATA_DIR";

/// `$BUILDR_DATA_DIR`, else `<data dir>/buildr`
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join("buildr"))
        .context("Could not determine data directory (set BUILDR_DATA_DIR)")
}

/// Everything a command needs: config, store, and the current user
pub struct App {
    pub config: SystemConfig,
    pub data_dir: PathBuf,
    pub store: WorkspaceStore,
}

impl App {
    pub fn open(config: SystemConfig) -> Result<Self> {
        let data_dir = data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let store = WorkspaceStore::open(&data_dir).context("Failed to open workspace store")?;
        Ok(Self {
            config,
            data_dir,
            store,
        })
    }

    /// Load the system config and open the store
    pub fn load() -> Result<Self> {
        Self::open(system_config::load()?)
    }

    pub fn user(&self) -> &str {
        &self.config.github.user
    }

    /// The linked target; fails unless repo, branch, and installation are all set
    pub fn linked_target(&self) -> Result<SyncTarget> {
        let settings = self.store.settings(self.user())?;
        let target = settings.target().context("Run 'buildr link' first")?;
        settings
            .installation()
            .context("Run 'buildr link <repo> --installation <id>' first")?;
        Ok(target)
    }

    pub fn github(&self) -> Result<GithubClient> {
        let token = self.config.github.token.clone().unwrap_or_default();
        GithubClient::with_api_url(&self.config.github.api_url, token, self.config.github.timeout())
            .with_context(|| format!("Set github.token in the config file or {}", system_config::TOKEN_ENV))
    }

    pub fn service<'a>(&'a self, remote: &'a GithubClient) -> SyncService<'a, GithubClient> {
        SyncService::new(remote, &self.store, self.user()).with_config(self.config.sync.clone())
    }

    /// What publishing `workspace` would do; no network access
    pub fn diff(&self, workspace: &Workspace) -> Result<SnapshotDiff> {
        let rules = IgnoreRules::from_contents(&workspace.file_contents, &self.config.sync.ignore)?;
        Ok(reconcile::diff(
            &workspace.synced_file_state,
            &workspace.file_structure,
            &workspace.file_contents,
            &rules,
        ))
    }

    /// Resolve a workspace reference, or the active workspace when none is given
    ///
    /// Accepts a full id or a unique id prefix of at least 4 characters.
    pub fn workspace(&self, reference: Option<&str>) -> Result<Workspace> {
        let user = self.user();
        let Some(reference) = reference else {
            return self
                .store
                .active(user)?
                .context("No active workspace. Clone one with 'buildr clone' or pick one with 'buildr workspaces use'");
        };

        if let Some(ws) = self.store.get(user, reference)? {
            return Ok(ws);
        }

        if reference.len() >= 4 {
            let matching: Vec<_> = self
                .store
                .list(user)?
                .into_iter()
                .filter(|s| s.id.starts_with(reference))
                .collect();
            match matching.len() {
                1 => return Ok(self.store.load(user, &matching[0].id)?),
                0 => {}
                n => anyhow::bail!("Ambiguous workspace prefix '{}': matches {} workspaces", reference, n),
            }
        }

        anyhow::bail!("Unknown workspace: '{}'", reference)
    }
}

/// Spinner for remote round trips
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - ts).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Short form of a workspace id for listings
pub fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(838_860), "819.20 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert!(format_relative_time(now).contains("seconds ago"));
        assert!(format_relative_time(now - chrono::Duration::hours(1)).contains("hour"));
        assert!(format_relative_time(now - chrono::Duration::days(1)).contains("day"));
        assert_eq!(format_relative_time(now + chrono::Duration::hours(1)), "in the future");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("01HN8XYZABCDEFG"), "01HN8XYZAB");
        assert_eq!(short_id("abc"), "abc");
    }
}
