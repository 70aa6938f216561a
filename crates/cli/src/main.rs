//! buildr CLI - edit a static site locally, publish it to GitHub

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod diff_utils;
mod locks;
mod logging;
mod system_config;
mod util;

/// buildr - workspace sync for GitHub-hosted static sites
#[derive(Parser)]
#[command(name = "buildr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the repository and branch to publish to
    Link {
        /// Repository as owner/name
        repo: String,
        /// Branch (default: main)
        #[arg(long, default_value = "main")]
        branch: String,
        /// GitHub App installation id
        #[arg(long)]
        installation: Option<u64>,
    },
    /// Show the stored repository linkage
    Whoami,
    /// Clone a GitHub branch into a new workspace
    Clone {
        /// Repository as owner/name (default: the linked one)
        #[arg(long)]
        repo: Option<String>,
        /// Branch (default: the linked one for the linked repository, else main)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Show a workspace and what a publish would change
    Status {
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
    },
    /// Show pending changes
    Diff {
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
        /// Show line-by-line diff against the published version
        #[arg(short = 'p', long)]
        patch: bool,
        /// Number of context lines (default: 3)
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
        /// Maximum files to show line diffs for (default: 10)
        #[arg(long, default_value = "10")]
        max_files: usize,
    },
    /// Publish a workspace to its branch
    Publish {
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
    },
    /// Discard local edits and reload the workspace from its branch
    Reclone {
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Commit the empty site template to the linked repository
    Scaffold,
    /// Publish a markdown file as a blog post
    Post {
        /// Markdown body
        file: PathBuf,
        #[arg(long)]
        title: String,
        /// URL slug (default: derived from the title)
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Category (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Main image: a local file (uploaded) or a URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Propose a workspace as a pull request
    Pr {
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Write a workspace's files into a directory
    Checkout {
        dir: PathBuf,
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
        /// Write into a non-empty directory
        #[arg(long)]
        force: bool,
    },
    /// Record a directory's files as the workspace content
    Stage {
        dir: PathBuf,
        /// Workspace id or prefix (default: active)
        workspace: Option<String>,
    },
    /// Manage stored workspaces
    #[command(subcommand)]
    Workspaces(WorkspaceCommands),
    /// View or edit the configuration file
    Config {
        /// List all values
        #[arg(long)]
        list: bool,
        /// Print one value
        #[arg(long, value_name = "KEY")]
        get: Option<String>,
        /// Set one value
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        set: Option<Vec<String>>,
        /// Print the config file path
        #[arg(long)]
        path: bool,
        /// With --path, create the file if missing
        #[arg(long)]
        create: bool,
        /// Print an example configuration
        #[arg(long)]
        example: bool,
    },
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// List all workspaces
    List,
    /// Make a workspace the active one
    Use {
        /// Workspace id or prefix
        workspace: String,
    },
    /// Delete a workspace
    Delete {
        /// Workspace id or prefix
        workspace: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file must stay fixable through `buildr config`
    let log_config = system_config::load().map(|c| c.log).unwrap_or_default();
    let _log_guard = logging::init(&log_config)?;

    match cli.command {
        Commands::Link { repo, branch, installation } => cmd::link::run(&repo, &branch, installation).await,
        Commands::Whoami => cmd::link::show().await,
        Commands::Clone { repo, branch } => cmd::clone::run(repo, branch).await,
        Commands::Status { workspace } => cmd::status::run(workspace.as_deref()).await,
        Commands::Diff { workspace, patch, context, max_files } => {
            cmd::diff::run(workspace.as_deref(), patch, context, max_files).await
        }
        Commands::Publish { workspace } => cmd::publish::run(workspace.as_deref()).await,
        Commands::Reclone { workspace, yes } => cmd::reclone::run(workspace.as_deref(), yes).await,
        Commands::Scaffold => cmd::scaffold::run().await,
        Commands::Post { file, title, slug, author, categories, image } => {
            cmd::post::run(cmd::post::PostArgs { file, title, slug, author, categories, image }).await
        }
        Commands::Pr { workspace, title, body } => cmd::pr::run(workspace.as_deref(), title, body).await,
        Commands::Checkout { dir, workspace, force } => {
            cmd::checkout::run(&dir, workspace.as_deref(), force).await
        }
        Commands::Stage { dir, workspace } => cmd::stage::run(&dir, workspace.as_deref()).await,
        Commands::Workspaces(command) => match command {
            WorkspaceCommands::List => cmd::workspaces::list().await,
            WorkspaceCommands::Use { workspace } => cmd::workspaces::use_workspace(&workspace).await,
            WorkspaceCommands::Delete { workspace } => cmd::workspaces::delete(&workspace).await,
        },
        Commands::Config { list: _, get, set, path, create, example } => {
            if let Some(key) = get {
                cmd::config::run_get(&key).await
            } else if let Some([key, value]) = set.as_deref() {
                cmd::config::run_set(key, value).await
            } else if path {
                cmd::config::run_path(create).await
            } else if example {
                cmd::config::run_example().await
            } else {
                cmd::config::run_list().await
            }
        }
    }
}
