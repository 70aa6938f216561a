//! Clone importer
//!
//! Pulls a branch listing and every non-image blob, and rebuilds the
//! `(tree, contents, fingerprints)` triple that seeds or refreshes a
//! workspace. This is the only place fingerprints are derived from the
//! remote's own state.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use buildr_core::{FileContents, Result, Snapshot, SyncedFileState, TreeBuilder, is_image_path};
use tracing::{debug, info};

use crate::repository::RemoteRepository;

/// Snapshot produced by an import
pub type ImportedSnapshot = Snapshot;

/// MIME type used when a non-text blob is kept as a data URL
const OPAQUE_MIME: &str = "application/octet-stream";

/// Import every non-image file of a branch
pub async fn import_all<R>(remote: &R, repo: &str, branch: &str) -> Result<ImportedSnapshot>
where
    R: RemoteRepository + ?Sized,
{
    let listing = remote.list_tree(repo, branch).await?;

    let mut builder = TreeBuilder::new();
    let mut contents = FileContents::new();
    let mut fingerprints = SyncedFileState::new();
    let mut excluded = 0usize;

    for item in &listing {
        // Directories are implied by their files, so one holding only
        // images stays out of the tree
        if !item.is_blob() {
            continue;
        }
        if is_image_path(&item.path) {
            excluded += 1;
            continue;
        }
        builder.push(&item.path, item.kind);

        let bytes = remote.get_blob(repo, &item.sha).await?;
        contents.insert(item.path.clone(), decode_content(&item.path, bytes));
        fingerprints.insert(item.path.clone(), item.sha);
    }

    info!(
        "Imported {} files from {}@{} ({} images excluded)",
        fingerprints.len(),
        repo,
        branch,
        excluded
    );

    Ok(Snapshot {
        tree: builder.finish(),
        contents,
        fingerprints,
    })
}

/// Text stays text; anything else is kept as a data URL so it round-trips
fn decode_content(path: &str, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("{} is not UTF-8, keeping it as binary", path);
            format!("data:{};base64,{}", OPAQUE_MIME, STANDARD.encode(e.as_bytes()))
        }
    }
}
