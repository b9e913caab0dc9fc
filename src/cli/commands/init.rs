//! CLI implementation for the `gantry init` command

use std::path::Path;

use anyhow::Result;

use crate::cli::output::status;
use crate::core::init::init_project;

/// Execute the init command
pub async fn execute(project_dir: &Path, name: Option<&str>, force: bool) -> Result<()> {
    let path = init_project(project_dir, name, force)?;

    println!("{} Created {}", status::SUCCESS, path.display());
    println!("  Run 'gantry run assemble' to build.");

    Ok(())
}
