//! Binary asset policy
//!
//! Image files never enter the reconciled text workspace: they are excluded
//! from the tree, the contents map, the fingerprint map, and both diff sets.
//! They reach the remote only through direct uploads (see post publishing).

/// Extensions treated as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Check whether a path names an image asset
pub fn is_image_path(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions_case_insensitive() {
        assert!(is_image_path("assets/images/logo.png"));
        assert!(is_image_path("assets/images/Photo.JPG"));
        assert!(is_image_path("a/b/c.Jpeg"));
        assert!(is_image_path("favicon.svg"));
        assert!(is_image_path("hero.webp"));
        assert!(is_image_path("anim.GIF"));
    }

    #[test]
    fn test_non_images() {
        assert!(!is_image_path("index.html"));
        assert!(!is_image_path("_posts/2024-01-01-hello.md"));
        assert!(!is_image_path("png"));
        assert!(!is_image_path("images/readme"));
        assert!(!is_image_path("notes.png.md"));
    }

    #[test]
    fn test_extension_only_counts_on_last_segment() {
        assert!(!is_image_path("logo.png/index.html"));
    }
}
