//! Clone a GitHub branch into a new workspace

use crate::util::{self, App};
use anyhow::{Context, Result};
use buildr_core::{SyncTarget, tree};
use journal::UserSettings;
use owo_colors::OwoColorize;

pub async fn run(repo: Option<String>, branch: Option<String>) -> Result<()> {
    let app = App::load()?;
    let settings = app.store.settings(app.user())?;
    let target = resolve_target(repo, branch, &settings)?;
    settings
        .installation()
        .context("Run 'buildr link <repo> --installation <id>' first")?;

    let github = app.github()?;
    let service = app.service(&github);

    let spinner = util::spinner(format!("Cloning {}...", target));
    let result = service.clone_workspace(&target).await;
    spinner.finish_and_clear();
    let workspace = result.with_context(|| format!("Failed to clone {}", target))?;

    let (files, folders) = tree::count_nodes(&workspace.file_structure);
    println!("{} Cloned {}", "✓".green(), target.to_string().yellow());
    println!("  Workspace:   {}", workspace.id.cyan());
    println!("  Files:       {} in {} folders", files, folders);
    println!("  Active file: {}", workspace.active_file.as_deref().unwrap_or("-"));
    println!();
    println!(
        "{}",
        format!("Tip: materialize it with 'buildr checkout <dir> {}'", util::short_id(&workspace.id)).dimmed()
    );
    Ok(())
}

/// Merge `--repo`/`--branch` with the stored linkage, flag by flag
///
/// The linked branch is only a default for the linked repository; any other
/// repository defaults to `main`.
fn resolve_target(repo: Option<String>, branch: Option<String>, settings: &UserSettings) -> Result<SyncTarget> {
    let linked_repo = settings.github_repo.clone().filter(|r| !r.trim().is_empty());
    let linked_branch = settings.github_branch.clone().filter(|b| !b.trim().is_empty());

    let uses_linked_repo = repo.is_none() || repo == linked_repo;
    let repo = repo
        .or(linked_repo)
        .context("No repository given. Pass --repo or run 'buildr link' first")?;
    let branch = match branch {
        Some(branch) => branch,
        None if uses_linked_repo => linked_branch.unwrap_or_else(|| "main".to_string()),
        None => "main".to_string(),
    };
    Ok(SyncTarget::new(repo, branch)?)
}
