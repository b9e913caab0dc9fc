//! Build output layout
//!
//! The output root comes from the manifest; every project's output
//! directory is derived from it by a pure function of the project path.
//! Nothing here is shared mutable state: the layout is built once and
//! passed down to whoever needs a path.

use std::path::{Path, PathBuf};

use crate::config::defaults::STAMPS_DIR;
use crate::core::manifest::{substitute_env_vars, BuildConfig};
use crate::error::ManifestError;

/// Derived output paths for a build invocation
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    /// Resolve the output root below the invocation directory
    pub fn new(project_dir: &Path, build: &BuildConfig) -> Result<Self, ManifestError> {
        let output_dir = substitute_env_vars(&build.output_dir)?;
        Ok(Self {
            root: project_dir.join(output_dir),
        })
    }

    /// The output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output directory for a project: one filesystem segment per project
    /// path segment. Distinct project paths never collide.
    pub fn project_dir(&self, project_path: &str) -> PathBuf {
        if project_path.is_empty() {
            return self.root.clone();
        }
        let mut dir = self.root.clone();
        for segment in project_path.split(':') {
            dir.push(segment);
        }
        dir
    }

    /// Directory for stamp files
    pub fn stamps_dir(&self) -> PathBuf {
        self.root.join(STAMPS_DIR)
    }
}
