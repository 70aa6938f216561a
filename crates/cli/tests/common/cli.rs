//! Run the `buildr` binary against an isolated home directory
//!
//! Every `Sandbox` gets its own config and data directories, so tests never
//! read the developer's configuration or workspaces.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Isolated config + data directories
pub struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        let root = TempDir::new().context("Failed to create sandbox")?;
        std::fs::create_dir_all(root.path().join("home"))?;
        std::fs::create_dir_all(root.path().join("work"))?;
        Ok(Self { root })
    }

    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    /// Scratch directory for checkouts
    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn cmd(&self, args: &[&str]) -> BuildrCommand {
        let mut cmd = BuildrCommand::new(self.work_dir());
        cmd.args(args)
            .env("HOME", &self.home())
            .env("XDG_CONFIG_HOME", &self.home().join(".config"))
            .env("XDG_DATA_HOME", &self.home().join(".local/share"))
            .env("BUILDR_DATA_DIR", &self.data_dir())
            .env("BUILDR_LOG", "warn")
            .env_remove("BUILDR_GITHUB_TOKEN")
            .env_remove("BUILDR_API_URL");
        cmd
    }
}

/// CLI command builder with timing
pub struct BuildrCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: Vec<(String, Option<String>)>,
}

impl BuildrCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> &mut Self {
        self.env
            .push((key.to_string(), Some(value.as_ref().to_string_lossy().into_owned())));
        self
    }

    pub fn env_remove(&mut self, key: &str) -> &mut Self {
        self.env.push((key.to_string(), None));
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut command = Command::new(env!("CARGO_BIN_EXE_buildr"));
        command.args(&self.args).current_dir(&self.working_dir);
        for (key, value) in &self.env {
            match value {
                Some(value) => command.env(key, value),
                None => command.env_remove(key),
            };
        }

        let output = command.output().context("Failed to execute buildr")?;
        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[allow(dead_code)]
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}
