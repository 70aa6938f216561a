//! Configuration management command
//!
//! View and edit the system configuration file.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Keys accepted by `--get` and `--set`
pub const KEYS: &[&str] = &[
    "github.token",
    "github.api_url",
    "github.user",
    "github.timeout_secs",
    "sync.required_dirs",
    "sync.max_asset_bytes",
    "sync.ignore.use_gitignore",
    "sync.ignore.additional_patterns",
    "log.level",
    "log.file",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for key in KEYS {
        let (prefix, name) = key.rsplit_once('.').unwrap_or(("", key));
        if prefix != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }
        println!("  {} = {}", name.cyan(), get(&config, key)?);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  github.timeout_secs: 1-600");
    println!("  sync.max_asset_bytes: > 0 (default 838860)");
    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set(&mut config, key, value)?;
    config.validate().context("Invalid configuration value")?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), if key == "github.token" { "********" } else { value });
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }
    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn unknown(key: &str) -> anyhow::Error {
    anyhow::anyhow!("Unknown config key: {}. Use 'buildr config --list' to see available keys.", key)
}

fn list_value(items: &[String]) -> String {
    items.join(",")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn get(config: &SystemConfig, key: &str) -> Result<String> {
    Ok(match key {
        "github.token" => match config.github.token {
            Some(_) => "******** (set)".to_string(),
            None => "(not set)".to_string(),
        },
        "github.api_url" => config.github.api_url.clone(),
        "github.user" => config.github.user.clone(),
        "github.timeout_secs" => config.github.timeout_secs.to_string(),
        "sync.required_dirs" => list_value(&config.sync.required_dirs),
        "sync.max_asset_bytes" => config.sync.max_asset_bytes.to_string(),
        "sync.ignore.use_gitignore" => config.sync.ignore.use_gitignore.to_string(),
        "sync.ignore.additional_patterns" => list_value(&config.sync.ignore.additional_patterns),
        "log.level" => config.log.level.clone(),
        "log.file" => config
            .log
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(stderr only)".to_string()),
        _ => return Err(unknown(key)),
    })
}

pub fn set(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "github.token" => config.github.token = Some(value.to_string()).filter(|v| !v.is_empty()),
        "github.api_url" => config.github.api_url = value.trim_end_matches('/').to_string(),
        "github.user" => config.github.user = value.to_string(),
        "github.timeout_secs" => {
            config.github.timeout_secs = value.parse().context("Invalid value: must be a positive integer")?;
        }
        "sync.required_dirs" => config.sync.required_dirs = parse_list(value),
        "sync.max_asset_bytes" => {
            config.sync.max_asset_bytes = value.parse().context("Invalid value: must be a positive integer")?;
        }
        "sync.ignore.use_gitignore" => {
            config.sync.ignore.use_gitignore = value.parse().context("Invalid value: must be 'true' or 'false'")?;
        }
        "sync.ignore.additional_patterns" => config.sync.ignore.additional_patterns = parse_list(value),
        "log.level" => config.log.level = value.to_string(),
        "log.file" => config.log.file = Some(value.into()).filter(|p: &std::path::PathBuf| !p.as_os_str().is_empty()),
        _ => return Err(unknown(key)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips() {
        let config = SystemConfig::default();
        for key in KEYS {
            assert!(get(&config, key).is_ok(), "{}", key);
        }
        assert!(get(&config, "daemon.interval").is_err());
    }

    #[test]
    fn test_set_values() {
        let mut config = SystemConfig::default();
        set(&mut config, "sync.required_dirs", "_posts, _data ,").unwrap();
        assert_eq!(config.sync.required_dirs, vec!["_posts", "_data"]);

        set(&mut config, "sync.max_asset_bytes", "1024").unwrap();
        assert_eq!(config.sync.max_asset_bytes, 1024);

        set(&mut config, "github.api_url", "https://ghe.example.com/api/v3/").unwrap();
        assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");

        set(&mut config, "github.token", "secret").unwrap();
        assert_eq!(get(&config, "github.token").unwrap(), "******** (set)");

        assert!(set(&mut config, "github.timeout_secs", "soon").is_err());
        assert!(set(&mut config, "nope", "1").is_err());
    }
}
