//! Lay out an empty repository as a static site

use buildr_core::tree::KEEP_FILE;
use buildr_core::{FilePayload, Result, SyncTarget};
use tracing::info;

use crate::repository::RemoteRepository;

/// Directories a fresh site template starts with
pub const TEMPLATE_DIRS: &[&str] = &["_posts", "assets/images", "_data"];

/// Commit a keep-file into every template directory, one commit each
///
/// Returns the committed paths.
pub async fn scaffold_template<R>(remote: &R, target: &SyncTarget) -> Result<Vec<String>>
where
    R: RemoteRepository + ?Sized,
{
    let mut committed = Vec::with_capacity(TEMPLATE_DIRS.len());
    for dir in TEMPLATE_DIRS {
        let path = format!("{}/{}", dir, KEEP_FILE);
        remote
            .put_file(
                &target.repo,
                &target.branch,
                &path,
                &FilePayload::Text(String::new()),
                &format!("buildr: scaffold template - add {}", path),
            )
            .await?;
        committed.push(path);
    }
    info!("Scaffolded {} with {} directories", target, committed.len());
    Ok(committed)
}
