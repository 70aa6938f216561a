//! Remote repository integration
//!
//! This crate provides:
//! - The `RemoteRepository` contract (GitHub REST and in-memory implementations)
//! - The clone importer (`import_all`)
//! - The sync executor (`Publisher`) and the per-user `SyncService`
//! - Post publishing, pull-request proposals, and template scaffolding

pub mod github;
pub mod import;
pub mod memory;
pub mod post;
pub mod publish;
pub mod pull_request;
pub mod repository;
pub mod scaffold;

// Re-exports
pub use github::GithubClient;
pub use import::{ImportedSnapshot, import_all};
pub use memory::MemoryRemote;
pub use post::{ImagePipeline, PassThrough, Post, PostPublisher, PublishedPost};
pub use publish::{PublishReport, Publisher, SyncConfig, SyncService};
pub use pull_request::{OpenedPullRequest, PullRequestDetails, open_pull_request};
pub use repository::{RemoteRepository, TreeItem};
pub use scaffold::scaffold_template;
