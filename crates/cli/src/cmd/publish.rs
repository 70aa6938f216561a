//! Publish a workspace to its GitHub branch

use crate::locks::WorkspaceLock;
use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub async fn run(workspace: Option<&str>) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;
    let _lock = WorkspaceLock::acquire(&app.data_dir, &ws.id, "publish")?;

    let github = app.github()?;
    let service = app.service(&github);

    let spinner = util::spinner(format!("Publishing to {}@{}...", ws.github_repo, ws.github_branch));
    let progress = spinner.clone();
    let result = service
        .publish_with_progress(&ws.id, move |step| progress.set_message(step.to_string()))
        .await;
    spinner.finish_and_clear();
    let report = result.with_context(|| format!("Failed to publish workspace {}", util::short_id(&ws.id)))?;

    if report.deleted.is_empty() && report.upserted.is_empty() && report.failed.is_empty() && report.resumed == 0 {
        println!("{} Already up to date", "✓".green());
        return Ok(());
    }

    if report.resumed > 0 {
        println!(
            "{} Resumed an interrupted publish ({} steps already applied)",
            "↻".cyan(),
            report.resumed
        );
    }
    for path in &report.upserted {
        println!("  {} {}", "+".green(), path);
    }
    for path in &report.deleted {
        println!("  {} {}", "-".red(), path);
    }
    for (path, err) in &report.failed {
        println!("  {} {} {}", "✗".red(), path, format!("({})", err).dimmed());
    }
    for (path, err) in &report.skipped {
        println!("  {} {} {}", "?".yellow(), path, format!("(not published: {})", err).dimmed());
    }

    println!();
    println!(
        "{} Published {}@{}: {} updated, {} deleted",
        if report.is_clean() { "✓".green().to_string() } else { "!".yellow().to_string() },
        ws.github_repo,
        ws.github_branch,
        report.upserted.len().to_string().green(),
        report.deleted.len().to_string().red()
    );
    if !report.failed.is_empty() {
        println!(
            "{}",
            "Some deletes were rejected because the remote changed; publish again to retry against the refreshed state"
                .yellow()
        );
    }
    Ok(())
}
