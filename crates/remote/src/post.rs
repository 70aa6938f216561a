//! Publish a single blog post straight to the remote
//!
//! A post is written as `_posts/<date>-<slug>.md` with YAML front matter. An
//! inline main image (a `data:image/...` URL) is run through the image
//! pipeline and committed to `assets/images/<slug>.<ext>` first; the post then
//! references the committed path.

use buildr_core::{FilePayload, Result, SyncError, SyncTarget};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::publish::DEFAULT_MAX_ASSET_BYTES;
use crate::repository::RemoteRepository;

pub const POSTS_DIR: &str = "_posts";
pub const IMAGES_DIR: &str = "assets/images";

/// Bounding box for main images
pub const MAX_IMAGE_DIMENSION: u32 = 512;

/// Resize and recompress images before they are committed
///
/// Implementations fit the image inside `max_width` x `max_height` keeping
/// its aspect ratio.
pub trait ImagePipeline: Send + Sync {
    fn process(&self, bytes: Vec<u8>, max_width: u32, max_height: u32) -> Result<Vec<u8>>;

    /// Extension of the produced files
    fn extension(&self) -> &str {
        "webp"
    }
}

/// Pipeline that commits images unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ImagePipeline for PassThrough {
    fn process(&self, bytes: Vec<u8>, _max_width: u32, _max_height: u32) -> Result<Vec<u8>> {
        Ok(bytes)
    }
}

/// A post as authored in the editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub slug: String,
    pub author: String,
    pub categories: Vec<String>,
    /// Markdown body
    pub content: String,
    /// Existing image path/URL, or an inline `data:image/...` URL
    pub main_image: Option<String>,
}

/// Where a published post landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub post_path: String,
    pub image_path: Option<String>,
    /// Image reference written into the front matter
    pub main_image: Option<String>,
    /// Full markdown as committed
    pub markdown: String,
}

/// Commits posts and their main images
pub struct PostPublisher<'a, R: RemoteRepository + ?Sized> {
    remote: &'a R,
    target: SyncTarget,
    pipeline: &'a dyn ImagePipeline,
    max_asset_bytes: usize,
}

impl<'a, R: RemoteRepository + ?Sized> PostPublisher<'a, R> {
    pub fn new(remote: &'a R, target: SyncTarget, pipeline: &'a dyn ImagePipeline) -> Self {
        Self {
            remote,
            target,
            pipeline,
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }

    pub fn with_max_asset_bytes(mut self, limit: usize) -> Self {
        self.max_asset_bytes = limit;
        self
    }

    pub async fn publish_post(&self, post: &Post) -> Result<PublishedPost> {
        self.publish_post_at(post, Utc::now()).await
    }

    /// Publish with an explicit timestamp (file name date and front matter)
    pub async fn publish_post_at(&self, post: &Post, now: DateTime<Utc>) -> Result<PublishedPost> {
        let slug = if post.slug.trim().is_empty() {
            slugify(&post.title)
        } else {
            slugify(&post.slug)
        };
        if slug.is_empty() {
            return Err(SyncError::Configuration(
                "a post needs a title or slug to be published".into(),
            ));
        }

        let (repo, branch) = (&self.target.repo, &self.target.branch);
        self.remote.ensure_directory(repo, branch, POSTS_DIR).await?;
        self.remote.ensure_directory(repo, branch, IMAGES_DIR).await?;

        let mut image_path = None;
        let mut main_image = post.main_image.clone().filter(|i| !i.is_empty());

        if let Some(inline) = main_image.as_deref().filter(|i| i.starts_with("data:image")) {
            let path = format!("{}/{}.{}", IMAGES_DIR, slug, self.pipeline.extension());
            let decoded = match FilePayload::from_content(&path, inline)? {
                FilePayload::Binary(bytes) => bytes,
                FilePayload::Text(text) => text.into_bytes(),
            };
            let processed =
                self.pipeline
                    .process(decoded, MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION)?;
            if processed.len() > self.max_asset_bytes {
                return Err(SyncError::SizeLimit {
                    path,
                    size: processed.len(),
                    limit: self.max_asset_bytes,
                });
            }

            self.remote
                .put_file(
                    repo,
                    branch,
                    &path,
                    &FilePayload::Binary(processed),
                    &format!("buildr: add image for {}", slug),
                )
                .await?;
            main_image = Some(format!("/{}", path));
            image_path = Some(path);
        }

        let post_path = format!("{}/{}-{}.md", POSTS_DIR, now.format("%Y-%m-%d"), slug);
        let markdown = render_markdown(post, main_image.as_deref(), now)?;
        self.remote
            .put_file(
                repo,
                branch,
                &post_path,
                &FilePayload::Text(markdown.clone()),
                &format!("buildr: publish post \"{}\"", post.title),
            )
            .await?;

        info!("Published post {} to {}", post_path, self.target);
        Ok(PublishedPost {
            post_path,
            image_path,
            main_image,
            markdown,
        })
    }
}

/// YAML header of a post file
#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    author: &'a str,
    date: String,
    categories: Vec<&'a str>,
    image: &'a str,
}

/// Front matter plus body
pub fn render_markdown(post: &Post, main_image: Option<&str>, now: DateTime<Utc>) -> Result<String> {
    let front_matter = FrontMatter {
        title: &post.title,
        author: &post.author,
        date: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        categories: post
            .categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect(),
        image: main_image.unwrap_or(""),
    };
    let yaml = serde_yaml::to_string(&front_matter)
        .map_err(|e| SyncError::Configuration(format!("failed to render front matter: {}", e)))?;
    Ok(format!("---\n{}---\n\n{}", yaml, post.content))
}

/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            dash = true;
        }
    }
    slug
}
