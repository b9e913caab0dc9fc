//! CLI implementation for the `gantry tree` command

use std::path::Path;

use anyhow::Result;

use crate::core::tree::{render_dot, render_tree};
use crate::core::workspace::Workspace;

/// Execute the tree command
pub async fn execute(project_dir: &Path, graph: bool) -> Result<()> {
    let workspace = Workspace::load(project_dir)?;

    if graph {
        print!("{}", render_dot(&workspace));
    } else {
        print!("{}", render_tree(&workspace));
    }

    Ok(())
}
