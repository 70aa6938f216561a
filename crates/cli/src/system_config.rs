//! System-wide configuration
//!
//! Lives at `<config dir>/buildr/config.toml`. Every section is optional;
//! missing keys take their defaults. `BUILDR_GITHUB_TOKEN` and
//! `BUILDR_API_URL` override the file.

use anyhow::{Context, Result};
use remote::SyncConfig;
use remote::github::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_ENV: &str = "BUILDR_GITHUB_TOKEN";
pub const API_URL_ENV: &str = "BUILDR_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access or installation token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Local user the workspaces are stored under
    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            user: default_user(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GithubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when neither BUILDR_LOG nor RUST_LOG is set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SystemConfig {
    /// Check ranges and required shapes
    pub fn validate(&self) -> Result<()> {
        if !(1..=600).contains(&self.github.timeout_secs) {
            anyhow::bail!(
                "github.timeout_secs must be between 1 and 600 (got {})",
                self.github.timeout_secs
            );
        }
        if self.github.user.trim().is_empty() || self.github.user.contains('\0') {
            anyhow::bail!("github.user must be a non-empty name");
        }
        if !self.github.api_url.starts_with("http://") && !self.github.api_url.starts_with("https://") {
            anyhow::bail!("github.api_url must be an http(s) URL");
        }
        if self.sync.max_asset_bytes == 0 {
            anyhow::bail!("sync.max_asset_bytes must be positive");
        }
        if self.sync.required_dirs.iter().any(|d| d.trim_matches('/').is_empty()) {
            anyhow::bail!("sync.required_dirs must not contain empty paths");
        }
        tracing_subscriber::EnvFilter::try_new(&self.log.level)
            .with_context(|| format!("log.level is not a valid filter: {}", self.log.level))?;
        Ok(())
    }

    /// Apply environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                self.github.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                self.github.api_url = url;
            }
        }
        self
    }
}

/// `<config dir>/buildr/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("buildr").join("config.toml"))
}

/// Load the config file (defaults when absent), with environment overrides
pub fn load() -> Result<SystemConfig> {
    let config = match config_file_path() {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse(&text).with_context(|| format!("Invalid config file {}", path.display()))?
        }
        _ => SystemConfig::default(),
    };
    Ok(config.with_env())
}

pub fn parse(text: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Write the config file, creating its directory
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Create the config file with defaults if it does not exist yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default())?;
    }
    Ok(path)
}

pub fn example_config() -> &'static str {
    r#"# buildr configuration

[github]
# Token used for every GitHub call (or set BUILDR_GITHUB_TOKEN)
# token = "ghp_..."
api_url = "https://api.github.com"
user = "default"
timeout_secs = 30

[sync]
# Directories created (with a .gitkeep) before publishing
required_dirs = ["_posts", "assets/images"]
# Largest binary file a publish may commit, in bytes
max_asset_bytes = 838860

[sync.ignore]
use_gitignore = true
additional_patterns = ["*.tmp"]

[log]
level = "info"
# file = "/tmp/buildr.log"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_parses() {
        let config = parse(example_config()).unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.sync.max_asset_bytes, 838_860);
        assert_eq!(config.sync.ignore.additional_patterns, vec!["*.tmp"]);
        assert!(config.github.token.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse("").unwrap();
        assert_eq!(config, SystemConfig::default());
        assert_eq!(config.github.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation() {
        let mut config = SystemConfig::default();
        config.github.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.sync.required_dirs.push("/".into());
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.github.api_url = "api.github.com".into();
        assert!(config.validate().is_err());

        assert!(parse("[log]\nlevel = \"debug,remote=trace\"\n").is_ok());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = SystemConfig::default();
        config.github.token = Some("secret".into());
        config.log.file = Some(PathBuf::from("/tmp/buildr.log"));
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse(&text).unwrap(), config);
    }
}
