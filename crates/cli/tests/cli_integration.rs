//! End-to-end tests of the offline `buildr` commands

mod common;

use anyhow::Result;
use common::Sandbox;

#[test]
fn test_config_example_and_path() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.cmd(&["config", "--example"]).assert_success()?;
    assert!(result.contains_stdout("[github]"));
    assert!(result.contains_stdout("max_asset_bytes = 838860"));

    let result = sandbox.cmd(&["config", "--path", "--create"]).assert_success()?;
    assert!(result.contains_stdout("Created config file"));
    let created = std::fs::read_to_string(sandbox.home().join(".config/buildr/config.toml"))
        .or_else(|_| {
            std::fs::read_to_string(
                sandbox.home().join("Library/Application Support/buildr/config.toml"),
            )
        })?;
    assert!(created.contains("[github]"));
    Ok(())
}

#[test]
fn test_config_set_and_get() -> Result<()> {
    let sandbox = Sandbox::new()?;

    sandbox
        .cmd(&["config", "--set", "sync.max_asset_bytes", "1024"])
        .assert_success()?;
    let result = sandbox
        .cmd(&["config", "--get", "sync.max_asset_bytes"])
        .assert_success()?;
    assert_eq!(result.stdout.trim(), "1024");

    let result = sandbox
        .cmd(&["config", "--set", "github.timeout_secs", "0"])
        .assert_failure()?;
    assert!(result.contains_stderr("Invalid configuration value"));

    let result = sandbox.cmd(&["config", "--get", "daemon.interval"]).assert_failure()?;
    assert!(result.contains_stderr("Unknown config key"));

    let result = sandbox.cmd(&["config", "--list"]).assert_success()?;
    assert!(result.contains_stdout("1024"));
    Ok(())
}

#[test]
fn test_empty_store() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.cmd(&["workspaces", "list"]).assert_success()?;
    assert!(result.contains_stdout("No workspaces yet"));

    let result = sandbox.cmd(&["status"]).assert_failure()?;
    assert!(result.contains_stderr("No active workspace"));

    let result = sandbox.cmd(&["workspaces", "use", "01ABCDEF"]).assert_failure()?;
    assert!(result.contains_stderr("Unknown workspace"));
    Ok(())
}

#[test]
fn test_link_and_whoami() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.cmd(&["whoami"]).assert_success()?;
    assert!(result.contains_stdout("not configured"));

    sandbox
        .cmd(&["link", "octo/site", "--branch", "gh-pages", "--installation", "42"])
        .assert_success()?;
    let result = sandbox.cmd(&["whoami"]).assert_success()?;
    assert!(result.contains_stdout("octo/site@gh-pages"));
    assert!(result.contains_stdout("42"));

    let result = sandbox.cmd(&["link", "not-a-repo"]).assert_failure()?;
    assert!(result.contains_stderr("owner/name"));
    Ok(())
}

#[test]
fn test_clone_requires_token() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.cmd(&["clone"]).assert_failure()?;
    assert!(result.contains_stderr("buildr link"));

    sandbox.cmd(&["link", "octo/site"]).assert_success()?;
    let result = sandbox.cmd(&["clone"]).assert_failure()?;
    assert!(result.contains_stderr("GitHub App installation is not configured"));

    sandbox
        .cmd(&["link", "octo/site", "--installation", "42"])
        .assert_success()?;
    let result = sandbox.cmd(&["clone"]).assert_failure()?;
    assert!(result.contains_stderr("BUILDR_GITHUB_TOKEN"));
    Ok(())
}

#[test]
fn test_remote_commands_require_installation() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let post = sandbox.work_dir().join("post.md");
    std::fs::write(&post, "Hello")?;
    let post = post.to_string_lossy().into_owned();

    sandbox.cmd(&["link", "octo/site"]).assert_success()?;
    for args in [
        vec!["scaffold"],
        vec!["post", post.as_str(), "--title", "Hello"],
    ] {
        let result = sandbox.cmd(&args).assert_failure()?;
        assert!(result.contains_stderr("--installation"), "{:?}: {}", args, result.stderr);
    }
    Ok(())
}
