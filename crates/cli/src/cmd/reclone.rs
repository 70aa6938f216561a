//! Overwrite a workspace with the current remote branch

use crate::locks::WorkspaceLock;
use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::Write;

pub async fn run(workspace: Option<&str>, yes: bool) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;

    let diff = app.diff(&ws)?;
    if !diff.is_empty() && !yes {
        println!(
            "{} {} unpublished changes in {} will be discarded.",
            "Warning:".yellow().bold(),
            diff.len(),
            ws.name.cyan()
        );
        print!("Continue? [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("{}", "Aborted".dimmed());
            return Ok(());
        }
    }

    let _lock = WorkspaceLock::acquire(&app.data_dir, &ws.id, "reclone")?;
    let github = app.github()?;
    let service = app.service(&github);

    let spinner = util::spinner(format!("Re-cloning {}@{}...", ws.github_repo, ws.github_branch));
    let result = service.force_reclone(&ws.id).await;
    spinner.finish_and_clear();
    let ws = result.context("Failed to re-clone workspace")?;

    println!(
        "{} Workspace {} now matches {}@{} ({} files, revision {})",
        "✓".green(),
        util::short_id(&ws.id).cyan(),
        ws.github_repo,
        ws.github_branch,
        ws.synced_file_state.len(),
        ws.revision
    );
    Ok(())
}
