//! Show a workspace and what a publish would change

use crate::util::{self, App};
use anyhow::Result;
use owo_colors::OwoColorize;
use reconcile::SnapshotDiff;

pub async fn run(workspace: Option<&str>) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;

    let diff = app.diff(&ws)?;
    let pending = app.store.pending().get(app.user(), &ws.id)?;

    println!("{}", "Workspace Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Workspace:   {} ({})", ws.name.cyan(), ws.id.dimmed());
    println!("Target:      {}@{}", ws.github_repo.yellow(), ws.github_branch.yellow());
    println!("Revision:    {}", ws.revision);
    println!("Saved:       {}", util::format_relative_time(ws.saved_at));
    println!("Synced:      {} files", ws.synced_file_state.len());
    let content_bytes: usize = ws.file_contents.values().map(String::len).sum();
    println!("Content:     {}", util::format_size(content_bytes as u64));
    if let Some(active) = &ws.active_file {
        println!("Active file: {}", active);
    }
    println!();

    if let Some(run) = pending {
        println!(
            "{} An interrupted publish ({}) has {} completed steps; 'buildr publish' resumes it",
            "!".yellow().bold(),
            run.run_id.to_string().dimmed(),
            run.completed.len()
        );
        println!();
    }

    print_summary(&diff);
    Ok(())
}

/// Added / modified / deleted listing shared by `status` and `diff`
pub fn print_summary(diff: &SnapshotDiff) {
    if diff.is_empty() {
        println!("{}", "Nothing to publish, workspace matches the last sync".dimmed());
    } else {
        let added: Vec<_> = diff.added().collect();
        let modified: Vec<_> = diff.modified().collect();

        if !added.is_empty() {
            println!("{} Added ({} files)", "A".green().bold(), added.len());
            for entry in &added {
                println!("  {} {}", "+".green(), entry.path);
            }
            println!();
        }
        if !modified.is_empty() {
            println!("{} Modified ({} files)", "M".yellow().bold(), modified.len());
            for entry in &modified {
                println!("  {} {}", "~".yellow(), entry.path);
            }
            println!();
        }
        if !diff.to_delete.is_empty() {
            println!("{} Deleted ({} files)", "D".red().bold(), diff.to_delete.len());
            for (path, _) in &diff.to_delete {
                println!("  {} {}", "-".red(), path);
            }
            println!();
        }

        println!(
            "{}",
            format!(
                "Total: {} added, {} modified, {} deleted, {} unchanged",
                added.len(),
                modified.len(),
                diff.to_delete.len(),
                diff.unchanged
            )
            .dimmed()
        );
    }

    if !diff.skipped.is_empty() {
        println!();
        println!("{} Skipped ({} files without usable content)", "!".yellow().bold(), diff.skipped.len());
        for (path, err) in &diff.skipped {
            println!("  {} {} {}", "?".yellow(), path, format!("({})", err).dimmed());
        }
    }
}
