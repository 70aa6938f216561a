//! Store the GitHub repository a user publishes to

use crate::util::App;
use anyhow::Result;
use buildr_core::SyncTarget;
use owo_colors::OwoColorize;

pub async fn run(repo: &str, branch: &str, installation: Option<u64>) -> Result<()> {
    let app = App::load()?;
    let target = SyncTarget::new(repo, branch)?;

    let mut settings = app.store.settings(app.user())?;
    settings.github_repo = Some(target.repo.clone());
    settings.github_branch = Some(target.branch.clone());
    if installation.is_some() {
        settings.installation_id = installation;
    }
    if settings.github_username.is_none() {
        settings.github_username = target.repo.split('/').next().map(str::to_string);
    }
    app.store.put_settings(app.user(), &settings)?;

    println!("{} Linked {} to {}", "✓".green(), app.user().cyan(), target.to_string().yellow());
    Ok(())
}

/// Show the stored linkage
pub async fn show() -> Result<()> {
    let app = App::load()?;
    let settings = app.store.settings(app.user())?;

    println!("{}", "Remote linkage".bold());
    println!("  User:          {}", app.user().cyan());
    match settings.target() {
        Ok(target) => println!("  Target:        {}", target.to_string().yellow()),
        Err(e) => println!("  Target:        {}", e.to_string().red()),
    }
    match settings.installation() {
        Ok(id) => println!("  Installation:  {}", id),
        Err(_) => println!("  Installation:  {}", "not set".dimmed()),
    }
    if let Some(active) = settings.active_workspace_id {
        println!("  Active:        {}", active);
    }
    Ok(())
}
