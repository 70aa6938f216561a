//! Ignore pattern management for sync
//!
//! Supports two sources of ignore patterns:
//! 1. The workspace's own `.gitignore` (read from the contents map, not disk)
//! 2. Config-based patterns (additional custom patterns)
//!
//! Both use full gitignore semantics: later patterns override earlier ones,
//! `!` re-includes, and a trailing `/` matches a directory and everything
//! below it.

use buildr_core::{FileContents, SyncError};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Path of the ignore file inside a workspace
pub const GITIGNORE_PATH: &str = ".gitignore";

/// Compiled ignore rule set
///
/// Immutable once compiled; one set is built per sync operation and shared by
/// the delete and upsert computations.
#[derive(Clone)]
pub struct IgnoreRules {
    /// Compiled matcher (None when no pattern was accepted)
    matcher: Option<Gitignore>,

    /// Number of accepted patterns
    patterns: usize,
}

impl IgnoreRules {
    /// A rule set that ignores nothing
    pub fn empty() -> Self {
        Self {
            matcher: None,
            patterns: 0,
        }
    }

    /// Compile gitignore-format text
    ///
    /// Lines that are not valid globs are skipped with a warning.
    pub fn compile(pattern_text: &str) -> Result<Self, SyncError> {
        Self::compile_with(pattern_text, &IgnoreConfig::default())
    }

    /// Compile gitignore-format text plus the configured extra patterns
    ///
    /// Extra patterns are added after the file's own lines, so they win.
    pub fn compile_with(pattern_text: &str, config: &IgnoreConfig) -> Result<Self, SyncError> {
        let mut builder = GitignoreBuilder::new("");
        let mut patterns = 0;

        let file_lines = if config.use_gitignore {
            pattern_text.lines().collect::<Vec<_>>()
        } else {
            Vec::new()
        };
        let lines = file_lines
            .into_iter()
            .chain(config.additional_patterns.iter().map(String::as_str));

        for line in lines {
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match builder.add_line(None, trimmed) {
                Ok(_) => patterns += 1,
                Err(e) => warn!("Skipping invalid ignore pattern '{}': {}", trimmed, e),
            }
        }

        if patterns == 0 {
            return Ok(Self::empty());
        }

        let matcher = builder
            .build()
            .map_err(|e| SyncError::Configuration(format!("invalid ignore rules: {}", e)))?;
        debug!("Compiled {} ignore patterns", patterns);

        Ok(Self {
            matcher: Some(matcher),
            patterns,
        })
    }

    /// Compile the rules of a workspace from its `.gitignore` entry
    pub fn from_contents(contents: &FileContents, config: &IgnoreConfig) -> Result<Self, SyncError> {
        let text = contents.get(GITIGNORE_PATH).map(String::as_str).unwrap_or("");
        Self::compile_with(text, config)
    }

    /// Check if a file path should be ignored
    pub fn is_ignored(&self, path: &str) -> bool {
        self.is_ignored_as(path, false)
    }

    /// Check if a path should be ignored, stating whether it is a directory
    ///
    /// Parent directories are consulted first, so `build/` ignores
    /// `build/out/app.js`. As in git, nothing below an excluded directory can
    /// be re-included by a later `!` pattern.
    pub fn is_ignored_as(&self, path: &str, is_dir: bool) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return false;
        }

        let mut end = 0;
        while let Some(offset) = path[end..].find('/') {
            end += offset;
            if matcher.matched(&path[..end], true).is_ignore() {
                return true;
            }
            end += 1;
        }
        matcher.matched(path, is_dir).is_ignore()
    }

    /// Number of accepted patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("patterns", &self.patterns)
            .finish()
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use the workspace's .gitignore (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Additional patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
