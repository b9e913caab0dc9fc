//! CLI implementation for the `gantry clean` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::status;
use crate::core::clean::{clean_output, has_artifacts};
use crate::core::layout::BuildLayout;
use crate::core::manifest::Manifest;

/// Execute the clean command
pub async fn execute(project_dir: &Path) -> Result<()> {
    let manifest = Manifest::load(project_dir)
        .with_context(|| format!("Failed to load manifest from {}", project_dir.display()))?;
    let layout = BuildLayout::new(project_dir, &manifest.build)?;

    if !has_artifacts(&layout) {
        println!("{} Nothing to clean", status::SUCCESS);
        return Ok(());
    }

    let result = clean_output(&layout).with_context(|| "Failed to clean build artifacts")?;

    if result.removed.is_empty() {
        println!("{} Nothing to clean", status::SUCCESS);
    } else {
        println!("{} Cleaned build artifacts:", status::SUCCESS);
        for dir in &result.removed {
            println!("  Removed {}", dir.display());
        }
    }

    Ok(())
}
