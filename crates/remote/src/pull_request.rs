//! Propose workspace changes as a pull request
//!
//! Instead of writing to the target branch, every file of the workspace is
//! committed to a fresh branch cut from the target's head, and a pull request
//! is opened back into the target.

use buildr_core::tree::{self, FileNode};
use buildr_core::{FileContents, FilePayload, Result, SyncTarget};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::repository::{RemoteRepository, update_message};

/// Prefix of branches created for pull requests
pub const BRANCH_PREFIX: &str = "buildr-update-";

/// Title and description of the pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDetails {
    pub title: String,
    pub body: String,
}

/// Where the proposal landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    pub url: String,
    pub branch: String,
    pub committed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Branch name for a proposal made at `now`
pub fn branch_name(now: DateTime<Utc>) -> String {
    format!("{}{}", BRANCH_PREFIX, now.format("%Y%m%dT%H%M%S%3fZ"))
}

/// Commit the whole tree to a new branch and open a pull request
pub async fn open_pull_request<R>(
    remote: &R,
    target: &SyncTarget,
    tree: &[FileNode],
    contents: &FileContents,
    details: &PullRequestDetails,
) -> Result<OpenedPullRequest>
where
    R: RemoteRepository + ?Sized,
{
    open_pull_request_at(remote, target, tree, contents, details, Utc::now()).await
}

pub async fn open_pull_request_at<R>(
    remote: &R,
    target: &SyncTarget,
    tree: &[FileNode],
    contents: &FileContents,
    details: &PullRequestDetails,
    now: DateTime<Utc>,
) -> Result<OpenedPullRequest>
where
    R: RemoteRepository + ?Sized,
{
    let repo = &target.repo;
    let branch = branch_name(now);

    let base_sha = remote.branch_head(repo, &target.branch).await?;
    remote.create_branch(repo, &branch, &base_sha).await?;

    let mut committed = Vec::new();
    let mut skipped = Vec::new();
    for file in tree::collect_files(tree) {
        let Some(raw) = contents.get(&file.path).or(file.content.as_ref()) else {
            warn!("Skipping {}: no content available", file.path);
            skipped.push(file.path);
            continue;
        };
        let payload = match FilePayload::from_content(&file.path, raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping {}: {}", file.path, e);
                skipped.push(file.path);
                continue;
            }
        };
        remote
            .put_file(repo, &branch, &file.path, &payload, &update_message(&file.name))
            .await?;
        committed.push(file.path);
    }

    let url = remote
        .create_pull_request(repo, &details.title, &details.body, &branch, &target.branch)
        .await?;
    info!("Opened pull request {} from {}", url, branch);

    Ok(OpenedPullRequest {
        url,
        branch,
        committed,
        skipped,
    })
}
