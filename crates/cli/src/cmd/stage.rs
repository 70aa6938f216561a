//! Record a directory's files as the workspace's editor state

use crate::util::{self, App};
use anyhow::{Context, Result};
use buildr_core::tree::{EntryKind, FileNode, TreeBuilder};
use buildr_core::{FileContents, FilePayload, is_image_path};
use owo_colors::OwoColorize;
use std::path::Path;
use walkdir::WalkDir;

pub async fn run(dir: &Path, workspace: Option<&str>) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;

    let (tree, contents, images) = read_tree(dir)?;
    let active = ws
        .active_file
        .clone()
        .filter(|f| contents.contains_key(f))
        .or_else(|| contents.contains_key("index.html").then(|| "index.html".to_string()));

    let saved = app
        .store
        .save_editor_state(app.user(), &ws.id, ws.revision, tree, contents, active)
        .context("Failed to save workspace (was it changed by another command?)")?;

    let diff = app.diff(&saved)?;
    println!(
        "{} Staged {} into {} (revision {})",
        "✓".green(),
        dir.display(),
        util::short_id(&saved.id).cyan(),
        saved.revision
    );
    if images > 0 {
        println!(
            "  {}",
            format!("{} image files ignored; images are uploaded with 'buildr post'", images).dimmed()
        );
    }
    println!("  {} changes to publish", diff.len());
    Ok(())
}

/// Walk `dir` into a tree and its contents; also returns the count of skipped images
///
/// Non-UTF-8 files are stored as data URLs so they publish as binary.
pub fn read_tree(dir: &Path) -> Result<(Vec<FileNode>, FileContents, usize)> {
    let mut builder = TreeBuilder::new();
    let mut contents = FileContents::new();
    let mut images = 0;

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let relative = entry.path().strip_prefix(dir)?;
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            builder.push(&path, EntryKind::Tree);
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if is_image_path(&path) {
            images += 1;
            continue;
        }

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => format!(
                "data:application/octet-stream;base64,{}",
                FilePayload::Binary(e.into_bytes()).to_base64()
            ),
        };
        builder.push(&path, EntryKind::Blob);
        contents.insert(path, text);
    }

    Ok((builder.finish(), contents, images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::checkout::export;
    use buildr_core::tree::{self, NodeKind};
    use buildr_core::{Snapshot, SyncTarget, Workspace};
    use tempfile::TempDir;

    #[test]
    fn test_read_tree() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("_posts")).unwrap();
        std::fs::create_dir_all(dir.path().join("drafts")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(dir.path().join("_posts/a.md"), "A").unwrap();
        std::fs::write(dir.path().join("logo.png"), b"\x89PNG").unwrap();
        std::fs::write(dir.path().join("font.bin"), [0xff, 0xfe]).unwrap();

        let (tree, contents, images) = read_tree(dir.path()).unwrap();

        assert_eq!(images, 1);
        assert_eq!(contents["_posts/a.md"], "A");
        assert_eq!(contents["font.bin"], "data:application/octet-stream;base64,//4=");
        assert!(!contents.contains_key(".git/HEAD"));
        assert_eq!(tree::find(&tree, "drafts").map(|n| n.kind), Some(NodeKind::Folder));
        assert!(tree::find(&tree, ".git").is_none());
    }

    #[test]
    fn test_checkout_then_stage_is_unchanged() {
        let target = SyncTarget::new("octo/site", "main").unwrap();
        let mut ws = Workspace::from_snapshot("ws", &target, Snapshot::default());
        ws.write_file("index.html", "<h1>hi</h1>").unwrap();
        ws.write_file("_posts/a.md", "A").unwrap();
        ws.create_folder("drafts").unwrap();

        let dir = TempDir::new().unwrap();
        export(&ws, dir.path()).unwrap();
        let (tree, contents, _) = read_tree(dir.path()).unwrap();

        assert_eq!(contents, ws.file_contents);
        let before: Vec<String> = tree::collect_files(&ws.file_structure).into_iter().map(|f| f.path).collect();
        let mut after: Vec<String> = tree::collect_files(&tree).into_iter().map(|f| f.path).collect();
        let mut before_sorted = before.clone();
        before_sorted.sort();
        after.sort();
        assert_eq!(after, before_sorted);
    }
}
