//! Per-workspace lock files
//!
//! A publish or re-clone holds an exclusive `flock` on
//! `<data dir>/locks/<workspace>.lock` for its whole run, so two processes
//! never write the same workspace to the remote at once.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held lock; released on drop
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    operation: String,
    started_at: String,
}

impl WorkspaceLock {
    /// Acquire the lock for `workspace_id` without blocking
    ///
    /// Fails when another process holds it; the error names that process.
    pub fn acquire(data_dir: &Path, workspace_id: &str, operation: &str) -> Result<Self> {
        let lock_path = lock_path(data_dir, workspace_id);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            let holder = Self::read_lock_content(&mut file)
                .map(|c| format!("{} (pid {}, since {})", c.operation, c.pid, c.started_at))
                .unwrap_or_else(|_| "another process".to_string());
            anyhow::bail!("Workspace {} is busy: {}", workspace_id, holder);
        }

        Self::write_lock_content(&mut file, operation)?;
        tracing::debug!("Locked workspace {} for {}", workspace_id, operation);

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    fn write_lock_content(file: &mut File, operation: &str) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            operation: operation.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        serde_json::from_str(&contents).context("Failed to deserialize lock content")
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_path(data_dir: &Path, workspace_id: &str) -> PathBuf {
    let name: String = workspace_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    data_dir.join("locks").join(format!("{}.lock", name))
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{FlockArg, flock};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();

        let first = WorkspaceLock::acquire(temp_dir.path(), "ws-1", "publish").unwrap();
        let err = WorkspaceLock::acquire(temp_dir.path(), "ws-1", "publish").unwrap_err();
        assert!(err.to_string().contains("publish (pid"));

        // Other workspaces are independent
        let other = WorkspaceLock::acquire(temp_dir.path(), "ws-2", "reclone");
        assert!(other.is_ok());

        drop(first);
        assert!(WorkspaceLock::acquire(temp_dir.path(), "ws-1", "publish").is_ok());
    }

    #[test]
    fn test_lock_file_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let lock = WorkspaceLock::acquire(temp_dir.path(), "ws-1", "publish").unwrap();
        let path = lock.path.clone();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_lock_path_is_sanitized() {
        let path = lock_path(Path::new("/data"), "../etc/passwd");
        assert_eq!(path, PathBuf::from("/data/locks/___etc_passwd.lock"));
    }
}
