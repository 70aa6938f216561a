//! List, switch, and delete stored workspaces

use crate::util::{self, App};
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn list() -> Result<()> {
    let app = App::load()?;
    let summaries = app.store.list(app.user())?;
    let active = app.store.settings(app.user())?.active_workspace_id;

    if summaries.is_empty() {
        println!("{}", "No workspaces yet. Create one with 'buildr clone'".dimmed());
        return Ok(());
    }

    println!("{}", "Workspaces".bold());
    for summary in summaries {
        let marker = if active.as_deref() == Some(summary.id.as_str()) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {}  {:<24} {}@{}  {}",
            marker,
            util::short_id(&summary.id).yellow(),
            summary.name.cyan(),
            summary.github_repo,
            summary.github_branch,
            format!("r{} · {}", summary.revision, util::format_relative_time(summary.saved_at)).dimmed()
        );
    }
    Ok(())
}

pub async fn use_workspace(reference: &str) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(Some(reference))?;
    app.store.set_active(app.user(), &ws.id)?;
    println!("{} Active workspace: {} ({})", "✓".green(), ws.name.cyan(), util::short_id(&ws.id));
    Ok(())
}

pub async fn delete(reference: &str) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(Some(reference))?;
    if app.store.delete(app.user(), &ws.id)? {
        println!("{} Deleted workspace {} ({})", "✓".green(), ws.name.cyan(), util::short_id(&ws.id));
    }
    Ok(())
}
