//! Materialize a workspace into a local directory for editing

use crate::util::App;
use anyhow::{Context, Result};
use buildr_core::tree::{self, KEEP_FILE};
use buildr_core::{FilePayload, Workspace};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(dir: &Path, workspace: Option<&str>, force: bool) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;

    if dir.exists() && std::fs::read_dir(dir)?.next().is_some() && !force {
        anyhow::bail!("{} is not empty (use --force to write into it)", dir.display());
    }

    let written = export(&ws, dir)?;
    println!(
        "{} Checked out {} files of {} into {}",
        "✓".green(),
        written,
        ws.name.cyan(),
        dir.display()
    );
    println!("{}", "Edit the files, then run 'buildr stage <dir>' to record them".dimmed());
    Ok(())
}

/// Write every workspace file below `dir`; returns the number of files written
///
/// Empty folders become empty directories rather than keep-files.
pub fn export(ws: &Workspace, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = 0;
    for file in tree::collect_files(&ws.file_structure) {
        let target = dir.join(&file.path);
        let stored = ws.file_contents.get(&file.path);

        if stored.is_none() && file.name == KEEP_FILE {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            continue;
        }

        let Some(raw) = stored.or(file.content.as_ref()) else {
            tracing::warn!("No content for {}, not written", file.path);
            continue;
        };
        let payload = FilePayload::from_content(&file.path, raw)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, payload.as_bytes())
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildr_core::{Snapshot, SyncTarget};
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_text_binary_and_empty_folders() {
        let target = SyncTarget::new("octo/site", "main").unwrap();
        let mut ws = Workspace::from_snapshot("ws", &target, Snapshot::default());
        ws.write_file("index.html", "<h1>hi</h1>").unwrap();
        ws.write_file("files/blob.bin", "data:application/octet-stream;base64,AAEC").unwrap();
        ws.create_folder("drafts").unwrap();

        let dir = TempDir::new().unwrap();
        let written = export(&ws, dir.path()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("index.html")).unwrap(), "<h1>hi</h1>");
        assert_eq!(std::fs::read(dir.path().join("files/blob.bin")).unwrap(), vec![0, 1, 2]);
        assert!(dir.path().join("drafts").is_dir());
        assert!(!dir.path().join("drafts/.gitkeep").exists());
    }
}
