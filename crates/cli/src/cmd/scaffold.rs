//! Lay out the linked repository as an empty static site

use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    let app = App::load()?;
    let target = app.linked_target()?;
    let github = app.github()?;

    let spinner = util::spinner(format!("Scaffolding {}...", target));
    let result = remote::scaffold_template(&github, &target).await;
    spinner.finish_and_clear();
    let committed = result.context("Failed to scaffold template")?;

    println!("{} Scaffolded {}", "✓".green(), target.to_string().yellow());
    for path in committed {
        println!("  {} {}", "+".green(), path);
    }
    Ok(())
}
