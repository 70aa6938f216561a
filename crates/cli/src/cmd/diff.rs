//! Show pending changes, optionally as line patches against the remote

use crate::cmd::status::print_summary;
use crate::diff_utils;
use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use remote::RemoteRepository;

pub async fn run(workspace: Option<&str>, patch: bool, context: usize, max_files: usize) -> Result<()> {
    let app = App::load()?;
    let ws = app.workspace(workspace)?;
    let diff = app.diff(&ws)?;

    println!("{}", "Diff Summary".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("From: {}@{}", ws.github_repo.yellow(), ws.github_branch.yellow());
    println!("To:   workspace {}", util::short_id(&ws.id).cyan());
    println!();

    print_summary(&diff);
    if !patch || diff.to_upsert.is_empty() {
        return Ok(());
    }

    // Previous versions come from the remote by blob id
    let github = app.github()?;
    let spinner = util::spinner("Fetching published versions...");
    let mut patches = Vec::new();
    for entry in diff.to_upsert.iter().take(max_files) {
        let old = match entry.previous {
            Some(sha) => Some(
                github
                    .get_blob(&ws.github_repo, &sha)
                    .await
                    .with_context(|| format!("Failed to fetch published {}", entry.path))?,
            ),
            None => None,
        };
        patches.push(diff_utils::render_patch(
            &entry.path,
            old.as_deref(),
            entry.payload.as_bytes(),
            context,
        ));
    }
    spinner.finish_and_clear();

    println!();
    for patch in patches {
        println!("{}", patch);
    }
    if diff.to_upsert.len() > max_files {
        println!(
            "{}",
            format!("... {} more files (raise --max-files to see them)", diff.to_upsert.len() - max_files).dimmed()
        );
    }
    Ok(())
}
