//! Clean logic
//!
//! Removes the build output root. A missing directory is not an error;
//! cleaning twice in a row succeeds both times.

use std::path::PathBuf;

use crate::core::layout::BuildLayout;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Result of a clean operation
#[derive(Debug, Default)]
pub struct CleanResult {
    /// Directories that were removed
    pub removed: Vec<PathBuf>,
    /// Directories that did not exist (skipped)
    pub skipped: Vec<PathBuf>,
}

/// Remove the build output root
pub fn clean_output(layout: &BuildLayout) -> Result<CleanResult, FilesystemError> {
    let mut result = CleanResult::default();
    let root = layout.root().to_path_buf();
    if filesystem::remove_dir_all(&root)? {
        result.removed.push(root);
    } else {
        result.skipped.push(root);
    }
    Ok(result)
}

/// Whether the output root currently exists
pub fn has_artifacts(layout: &BuildLayout) -> bool {
    layout.root().exists()
}
