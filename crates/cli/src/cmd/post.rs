//! Publish a markdown file as a blog post

use crate::util::{self, App};
use anyhow::{Context, Result};
use buildr_core::FilePayload;
use owo_colors::OwoColorize;
use remote::{PassThrough, Post, PostPublisher};
use std::path::Path;

pub struct PostArgs {
    pub file: std::path::PathBuf,
    pub title: String,
    pub slug: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub image: Option<String>,
}

pub async fn run(args: PostArgs) -> Result<()> {
    let app = App::load()?;
    let target = app.linked_target()?;

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let main_image = match args.image {
        Some(image) if Path::new(&image).is_file() => Some(inline_image(Path::new(&image))?),
        other => other,
    };
    let post = Post {
        title: args.title,
        slug: args.slug.unwrap_or_default(),
        author: args.author.unwrap_or_else(|| app.user().to_string()),
        categories: args.categories,
        content,
        main_image,
    };

    let github = app.github()?;
    let publisher =
        PostPublisher::new(&github, target, &PassThrough).with_max_asset_bytes(app.config.sync.max_asset_bytes);

    let spinner = util::spinner(format!("Publishing \"{}\"...", post.title));
    let result = publisher.publish_post(&post).await;
    spinner.finish_and_clear();
    let published = result.context("Failed to publish post")?;

    println!("{} Published {}", "✓".green(), published.post_path.cyan());
    if let Some(image) = published.image_path {
        println!("  Image: {}", image);
    }
    Ok(())
}

/// Read a local image into a `data:image/...` URL
fn inline_image(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime = image_mime(path).with_context(|| format!("{} is not a supported image", path.display()))?;
    Ok(format!("data:{};base64,{}", mime, FilePayload::Binary(bytes).to_base64()))
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a/cover.PNG")), Some("image/png"));
        assert_eq!(image_mime(Path::new("photo.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime(Path::new("notes.md")), None);
        assert_eq!(image_mime(Path::new("noext")), None);
    }

    #[test]
    fn test_inline_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(inline_image(&path).unwrap(), "data:image/png;base64,aGVsbG8=");
    }
}
