//! GitHub REST v3 implementation of the remote contract

use async_trait::async_trait;
use buildr_core::payload::decode_base64;
use buildr_core::{EntryKind, FilePayload, Fingerprint, Result, SyncError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::repository::{KEEP_FILE, RemoteRepository, TreeItem};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub REST API client authenticated with a bearer token
pub struct GithubClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

impl TreeResponse {
    /// Blob and tree entries of a complete listing
    ///
    /// GitHub caps recursive listings; a truncated one would silently drop
    /// files from the baseline, so it is an error.
    fn into_items(self, repo: &str, branch: &str) -> Result<Vec<TreeItem>> {
        if self.truncated {
            return Err(SyncError::Transport(format!(
                "tree listing for {}@{} was truncated by GitHub ({} entries returned)",
                repo,
                branch,
                self.tree.len()
            )));
        }

        let mut items = Vec::with_capacity(self.tree.len());
        for entry in self.tree {
            let kind = match entry.kind.as_str() {
                "blob" => EntryKind::Blob,
                "tree" => EntryKind::Tree,
                other => {
                    debug!("Skipping {} entry {}", other, entry.path);
                    continue;
                }
            };
            items.push(TreeItem {
                path: entry.path,
                kind,
                sha: Fingerprint::from_hex(&entry.sha)?,
            });
        }
        Ok(items)
    }
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Deserialize)]
struct ContentInfo {
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: ContentInfo,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct PullResponse {
    html_url: String,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, token, DEFAULT_TIMEOUT)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SyncError::missing("GitHub token"));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("buildr/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, repo: &str, tail: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo, tail)
    }

    fn contents_url(&self, repo: &str, path: &str) -> String {
        self.url(repo, &format!("contents/{}", encode_path(path)))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send a request; non-success statuses become errors
    async fn send(&self, builder: RequestBuilder, what: &str, path: Option<&str>) -> Result<Response> {
        let resp = self
            .request(builder)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("{} request failed: {}", what, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("GitHub {} failed: {} {}", what, status, body);
            return Err(status_error(status, what, &body, path));
        }
        Ok(resp)
    }

    async fn json<T: serde::de::DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::Decode(format!("{} response: {}", what, e)))
    }

    /// Current blob id of a file on a branch, if it exists
    async fn existing_sha(&self, repo: &str, branch: &str, path: &str) -> Result<Option<String>> {
        let builder = self
            .client
            .get(self.contents_url(repo, path))
            .query(&[("ref", branch)]);
        match self.send(builder, "contents GET", None).await {
            Ok(resp) => {
                // Directories answer with an array; only files carry a sha here
                let value: serde_json::Value = Self::json(resp, "contents GET").await?;
                Ok(value.get("sha").and_then(|s| s.as_str()).map(str::to_string))
            }
            Err(SyncError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RemoteRepository for GithubClient {
    async fn list_tree(&self, repo: &str, branch: &str) -> Result<Vec<TreeItem>> {
        let builder = self
            .client
            .get(self.url(repo, &format!("git/trees/{}", branch)))
            .query(&[("recursive", "1")]);
        let resp = self.send(builder, "tree listing", None).await?;
        let listing: TreeResponse = Self::json(resp, "tree listing").await?;
        listing.into_items(repo, branch)
    }

    async fn get_blob(&self, repo: &str, sha: &Fingerprint) -> Result<Vec<u8>> {
        let builder = self.client.get(self.url(repo, &format!("git/blobs/{}", sha)));
        let resp = self.send(builder, "blob fetch", None).await?;
        let blob: BlobResponse = Self::json(resp, "blob fetch").await?;
        match blob.encoding.as_str() {
            "base64" => decode_base64(&blob.content),
            "utf-8" => Ok(blob.content.into_bytes()),
            other => Err(SyncError::Decode(format!(
                "blob {} has unsupported encoding '{}'",
                sha, other
            ))),
        }
    }

    async fn put_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        body: &FilePayload,
        message: &str,
    ) -> Result<Fingerprint> {
        let mut request = json!({
            "message": message,
            "content": body.to_base64(),
            "branch": branch,
        });
        if let Some(sha) = self.existing_sha(repo, branch, path).await? {
            request["sha"] = json!(sha);
        }

        let builder = self.client.put(self.contents_url(repo, path)).json(&request);
        let resp = self.send(builder, "contents PUT", Some(path)).await?;
        let written: PutResponse = Self::json(resp, "contents PUT").await?;
        debug!("Committed {} ({} bytes)", path, body.len());
        Fingerprint::from_hex(&written.content.sha)
    }

    async fn delete_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        expected: &Fingerprint,
        message: &str,
    ) -> Result<()> {
        let request = json!({
            "message": message,
            "sha": expected.to_hex(),
            "branch": branch,
        });
        let builder = self.client.delete(self.contents_url(repo, path)).json(&request);
        self.send(builder, "contents DELETE", Some(path)).await?;
        debug!("Deleted {}", path);
        Ok(())
    }

    async fn ensure_directory(&self, repo: &str, branch: &str, path: &str) -> Result<()> {
        let builder = self
            .client
            .get(self.contents_url(repo, path))
            .query(&[("ref", branch)]);
        match self.send(builder, "contents GET", None).await {
            Ok(_) => Ok(()),
            Err(SyncError::NotFound(_)) => {
                let keep = format!("{}/{}", path.trim_end_matches('/'), KEEP_FILE);
                let message = format!("buildr: create {}", path);
                self.put_file(repo, branch, &keep, &FilePayload::Text(String::new()), &message)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        let builder = self.client.get(self.url(repo, &format!("git/ref/heads/{}", branch)));
        let resp = self.send(builder, "branch lookup", None).await?;
        let reference: RefResponse = Self::json(resp, "branch lookup").await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
        let request = json!({
            "ref": format!("refs/heads/{}", name),
            "sha": sha,
        });
        let builder = self.client.post(self.url(repo, "git/refs")).json(&request);
        self.send(builder, "branch creation", None).await?;
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
        let request = json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        });
        let builder = self.client.post(self.url(repo, "pulls")).json(&request);
        let resp = self.send(builder, "pull request creation", None).await?;
        let pull: PullResponse = Self::json(resp, "pull request creation").await?;
        Ok(pull.html_url)
    }
}

/// Map a failed response onto the error taxonomy
///
/// `path` is set for writes guarded by a blob sha, where 409/422 means the
/// remote file moved.
fn status_error(status: StatusCode, what: &str, body: &str, path: Option<&str>) -> SyncError {
    let detail = github_message(body).unwrap_or_else(|| status.to_string());
    match (status, path) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            SyncError::Auth(format!("{}: {}", what, detail))
        }
        (StatusCode::NOT_FOUND, Some(path)) => SyncError::NotFound(path.to_string()),
        (StatusCode::NOT_FOUND, None) => SyncError::NotFound(format!("{}: {}", what, detail)),
        (StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, Some(path)) => {
            SyncError::FingerprintMismatch {
                path: path.to_string(),
            }
        }
        _ => SyncError::Transport(format!("{} failed with {}: {}", what, status, detail)),
    }
}

/// The `message` field of a GitHub error body
fn github_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Characters escaped inside one path segment: all but RFC 3986 unreserved
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encode each path segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
