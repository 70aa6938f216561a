//! In-process remote used by tests and dry runs
//!
//! Stores branches as flat path -> bytes maps and fingerprints content with
//! real Git blob ids, so fingerprints round-trip exactly as with GitHub.

use async_trait::async_trait;
use buildr_core::{EntryKind, FilePayload, Fingerprint, Result, SyncError, hash_blob};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::repository::{KEEP_FILE, RemoteRepository, TreeItem};

type Files = BTreeMap<String, Vec<u8>>;

#[derive(Default)]
struct Branch {
    files: Files,
    head: String,
}

/// A pull request opened against the memory remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub repo: String,
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Default)]
struct State {
    branches: HashMap<(String, String), Branch>,
    blobs: HashMap<Fingerprint, Vec<u8>>,
    commits: Vec<String>,
    pulls: Vec<PullRequest>,
    next_commit: u64,
    /// Paths whose next delete reports a fingerprint mismatch
    stale: HashSet<String>,
    /// Remaining successful writes before writes start failing
    write_budget: Option<usize>,
}

impl State {
    fn commit(&mut self, repo: &str, branch: &str, message: &str) -> Result<()> {
        if let Some(budget) = self.write_budget.as_mut() {
            if *budget == 0 {
                return Err(SyncError::Transport("connection reset".into()));
            }
            *budget -= 1;
        }
        self.next_commit += 1;
        let head = format!("{:040x}", self.next_commit);
        let branch = self.branch_mut(repo, branch)?;
        branch.head = head;
        self.commits.push(message.to_string());
        Ok(())
    }

    fn branch(&self, repo: &str, branch: &str) -> Result<&Branch> {
        self.branches
            .get(&(repo.to_string(), branch.to_string()))
            .ok_or_else(|| SyncError::NotFound(format!("branch {} of {}", branch, repo)))
    }

    fn branch_mut(&mut self, repo: &str, branch: &str) -> Result<&mut Branch> {
        self.branches
            .get_mut(&(repo.to_string(), branch.to_string()))
            .ok_or_else(|| SyncError::NotFound(format!("branch {} of {}", branch, repo)))
    }
}

/// Memory-backed `RemoteRepository`
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) a branch with the given files
    pub fn with_branch<'a, I>(self, repo: &str, branch: &str, files: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        {
            let mut state = self.state.lock();
            let mut map = Files::new();
            for (path, bytes) in files {
                state.blobs.insert(hash_blob(bytes), bytes.to_vec());
                map.insert(path.to_string(), bytes.to_vec());
            }
            state.next_commit += 1;
            let head = format!("{:040x}", state.next_commit);
            state
                .branches
                .insert((repo.to_string(), branch.to_string()), Branch { files: map, head });
        }
        self
    }

    /// Content of a file on a branch
    pub fn file(&self, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state.branch(repo, branch).ok()?.files.get(path).cloned()
    }

    /// All file paths on a branch, sorted
    pub fn paths(&self, repo: &str, branch: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .branch(repo, branch)
            .map(|b| b.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace a file without going through the commit log, as another client would
    pub fn overwrite(&self, repo: &str, branch: &str, path: &str, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.blobs.insert(hash_blob(bytes), bytes.to_vec());
        if let Ok(b) = state.branch_mut(repo, branch) {
            b.files.insert(path.to_string(), bytes.to_vec());
        }
    }

    /// Make the next delete of `path` fail with a fingerprint mismatch
    pub fn mark_stale(&self, path: &str) {
        self.state.lock().stale.insert(path.to_string());
    }

    /// Allow `writes` more commits, then fail every write with a transport error
    pub fn fail_after(&self, writes: usize) {
        self.state.lock().write_budget = Some(writes);
    }

    /// Lift a previous `fail_after`
    pub fn heal(&self) {
        self.state.lock().write_budget = None;
    }

    /// Commit messages in order
    pub fn commits(&self) -> Vec<String> {
        self.state.lock().commits.clone()
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.lock().pulls.clone()
    }
}

#[async_trait]
impl RemoteRepository for MemoryRemote {
    async fn list_tree(&self, repo: &str, branch: &str) -> Result<Vec<TreeItem>> {
        let state = self.state.lock();
        let files = &state.branch(repo, branch)?.files;

        let mut dirs = BTreeSet::new();
        for path in files.keys() {
            let mut end = 0;
            while let Some(pos) = path[end..].find('/') {
                end += pos;
                dirs.insert(path[..end].to_string());
                end += 1;
            }
        }

        let mut items: Vec<TreeItem> = dirs
            .into_iter()
            .map(|dir| TreeItem {
                sha: hash_blob(dir.as_bytes()),
                path: dir,
                kind: EntryKind::Tree,
            })
            .collect();
        items.extend(
            files
                .iter()
                .map(|(path, bytes)| TreeItem::blob(path.clone(), hash_blob(bytes))),
        );
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(items)
    }

    async fn get_blob(&self, _repo: &str, sha: &Fingerprint) -> Result<Vec<u8>> {
        self.state
            .lock()
            .blobs
            .get(sha)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("blob {}", sha)))
    }

    async fn put_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        body: &FilePayload,
        message: &str,
    ) -> Result<Fingerprint> {
        let mut state = self.state.lock();
        state.branch(repo, branch)?;
        state.commit(repo, branch, message)?;

        let bytes = body.as_bytes().to_vec();
        let sha = hash_blob(&bytes);
        state.blobs.insert(sha, bytes.clone());
        state.branch_mut(repo, branch)?.files.insert(path.to_string(), bytes);
        Ok(sha)
    }

    async fn delete_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        expected: &Fingerprint,
        message: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let current = match state.branch(repo, branch)?.files.get(path) {
            Some(bytes) => hash_blob(bytes),
            None => return Err(SyncError::NotFound(path.to_string())),
        };
        if state.stale.remove(path) || current != *expected {
            return Err(SyncError::FingerprintMismatch {
                path: path.to_string(),
            });
        }
        state.commit(repo, branch, message)?;
        state.branch_mut(repo, branch)?.files.remove(path);
        Ok(())
    }

    async fn ensure_directory(&self, repo: &str, branch: &str, path: &str) -> Result<()> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let exists = self
            .state
            .lock()
            .branch(repo, branch)?
            .files
            .keys()
            .any(|p| p.starts_with(&prefix));
        if exists {
            return Ok(());
        }
        let keep = format!("{}{}", prefix, KEEP_FILE);
        self.put_file(
            repo,
            branch,
            &keep,
            &FilePayload::Text(String::new()),
            &format!("buildr: create {}", path),
        )
        .await?;
        Ok(())
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        Ok(self.state.lock().branch(repo, branch)?.head.clone())
    }

    async fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
        let mut state = self.state.lock();
        let key = (repo.to_string(), name.to_string());
        if state.branches.contains_key(&key) {
            return Err(SyncError::Transport(format!("reference {} already exists", name)));
        }
        let files = state
            .branches
            .iter()
            .find(|((r, _), b)| r == repo && b.head == sha)
            .map(|(_, b)| b.files.clone())
            .ok_or_else(|| SyncError::NotFound(format!("commit {}", sha)))?;
        state.branches.insert(
            key,
            Branch {
                files,
                head: sha.to_string(),
            },
        );
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String> {
        let mut state = self.state.lock();
        state.branch(repo, head)?;
        state.branch(repo, base)?;
        let number = state.pulls.len() as u64 + 1;
        state.pulls.push(PullRequest {
            number,
            repo: repo.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        });
        Ok(format!("https://github.com/{}/pull/{}", repo, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> MemoryRemote {
        MemoryRemote::new().with_branch(
            "octo/site",
            "main",
            [("index.html", &b"<h1>hi</h1>"[..]), ("_posts/a.md", &b"A"[..])],
        )
    }

    #[tokio::test]
    async fn test_listing_includes_directories() {
        let remote = remote();
        let items = remote.list_tree("octo/site", "main").await.unwrap();
        let paths: Vec<(&str, EntryKind)> = items.iter().map(|i| (i.path.as_str(), i.kind)).collect();
        assert_eq!(
            paths,
            vec![
                ("_posts", EntryKind::Tree),
                ("_posts/a.md", EntryKind::Blob),
                ("index.html", EntryKind::Blob),
            ]
        );
        assert_eq!(items[1].sha, hash_blob(b"A"));
    }

    #[tokio::test]
    async fn test_delete_checks_fingerprint() {
        let remote = remote();
        let wrong = hash_blob(b"not A");
        let err = remote
            .delete_file("octo/site", "main", "_posts/a.md", &wrong, "m")
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::FingerprintMismatch { path: "_posts/a.md".into() });

        remote
            .delete_file("octo/site", "main", "_posts/a.md", &hash_blob(b"A"), "m")
            .await
            .unwrap();
        assert!(remote.file("octo/site", "main", "_posts/a.md").is_none());

        let err = remote
            .delete_file("octo/site", "main", "_posts/a.md", &hash_blob(b"A"), "m")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ensure_directory_idempotent() {
        let remote = remote();
        remote.ensure_directory("octo/site", "main", "_posts").await.unwrap();
        remote.ensure_directory("octo/site", "main", "_data").await.unwrap();
        remote.ensure_directory("octo/site", "main", "_data").await.unwrap();
        assert_eq!(remote.commits(), vec!["buildr: create _data".to_string()]);
        assert_eq!(remote.file("octo/site", "main", "_data/.gitkeep"), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_write_budget() {
        let remote = remote();
        remote.fail_after(1);
        let body = FilePayload::Text("x".into());
        remote.put_file("octo/site", "main", "x.md", &body, "m").await.unwrap();
        let err = remote.put_file("octo/site", "main", "y.md", &body, "m").await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        remote.heal();
        remote.put_file("octo/site", "main", "y.md", &body, "m").await.unwrap();
    }

    #[tokio::test]
    async fn test_branch_and_pull_request() {
        let remote = remote();
        let head = remote.branch_head("octo/site", "main").await.unwrap();
        remote.create_branch("octo/site", "feature", &head).await.unwrap();
        assert_eq!(remote.paths("octo/site", "feature"), remote.paths("octo/site", "main"));

        let url = remote
            .create_pull_request("octo/site", "t", "b", "feature", "main")
            .await
            .unwrap();
        assert_eq!(url, "https://github.com/octo/site/pull/1");
        assert!(remote.create_branch("octo/site", "feature", &head).await.is_err());
    }
}
