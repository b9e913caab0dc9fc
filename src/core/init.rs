//! Project scaffolding logic

use std::path::{Path, PathBuf};

use crate::config::defaults::MANIFEST_FILE;
use crate::error::{GantryError, InitError};
use crate::infra::filesystem;

/// Starter manifest content for a new project
pub fn starter_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
version = "0.1.0"

[build]
output_dir = "build"

[[projects]]
path = "app"

[[tasks]]
name = "clean"
kind = "clean"

[[tasks]]
name = "prepare"
kind = "prepare"

[[tasks]]
name = "assemble"
kind = "stamp"
depends_on = ["prepare"]
"#
    )
}

/// Create a gantry.toml in `dir`
///
/// Refuses to overwrite an existing manifest unless `force` is set.
pub fn init_project(dir: &Path, name: Option<&str>, force: bool) -> Result<PathBuf, GantryError> {
    let path = dir.join(MANIFEST_FILE);
    if path.exists() && !force {
        return Err(InitError::AlreadyInitialized { path }.into());
    }
    let fallback = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unnamed".to_string());
    let name = name.unwrap_or(&fallback);
    filesystem::write_file(&path, &starter_manifest(name))?;
    Ok(path)
}
