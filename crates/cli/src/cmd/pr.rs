//! Propose a workspace as a pull request instead of publishing it

use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use remote::{PullRequestDetails, open_pull_request};

pub async fn run(workspace: Option<&str>, title: Option<String>, body: Option<String>) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;
    let target = ws.target()?;
    app.store
        .settings(app.user())?
        .installation()
        .context("Run 'buildr link <repo> --installation <id>' first")?;

    let details = PullRequestDetails {
        title: title.unwrap_or_else(|| format!("Update {} from buildr", ws.name)),
        body: body.unwrap_or_else(|| "Changes proposed from a buildr workspace.".to_string()),
    };

    let github = app.github()?;
    let spinner = util::spinner(format!("Opening pull request against {}...", target));
    let result = open_pull_request(&github, &target, &ws.file_structure, &ws.file_contents, &details).await;
    spinner.finish_and_clear();
    let opened = result.context("Failed to open pull request")?;

    println!("{} Opened {}", "✓".green(), opened.url.cyan());
    println!("  Branch:    {}", opened.branch.yellow());
    println!("  Committed: {} files", opened.committed.len());
    if !opened.skipped.is_empty() {
        println!("  Skipped:   {}", opened.skipped.join(", ").dimmed());
    }
    Ok(())
}
