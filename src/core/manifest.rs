//! Manifest (gantry.toml) parsing and validation
//!
//! The manifest is the static declaration a build run starts from: the
//! project tree, configuration action rules, and the task graph. Projects
//! and tasks are arrays, so their declaration order survives parsing; that
//! order is what breaks ties everywhere downstream.
//!
//! Supports environment variable substitution using ${VAR} syntax in
//! path-valued fields.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults::{DEFAULT_OUTPUT_DIR, MANIFEST_FILE};
use crate::core::actions::ActionRule;
use crate::core::task::TaskDecl;
use crate::error::ManifestError;
use crate::infra::filesystem;

/// The main project manifest (gantry.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Project configuration
    pub project: ProjectConfig,

    /// Build configuration
    #[serde(default)]
    pub build: BuildConfig,

    /// Subproject declarations, in file order
    #[serde(default)]
    pub projects: Vec<ProjectDecl>,

    /// Configuration action rules, in file order
    #[serde(default)]
    pub actions: Vec<ActionRule>,

    /// Task declarations, in file order
    #[serde(default)]
    pub tasks: Vec<TaskDecl>,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Project description
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Output directory root, relative to the invocation directory.
    /// Supports ${VAR} substitution.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            version: default_version(),
            description: None,
        }
    }
}

/// A subproject declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDecl {
    /// Colon-separated project path
    pub path: String,

    /// Projects whose evaluation must complete before this one starts
    #[serde(default)]
    pub evaluate_after: Vec<String>,

    /// Initial property bag entries
    #[serde(default)]
    pub properties: HashMap<String, toml::Value>,
}

impl Manifest {
    /// Parse and validate a manifest from TOML content
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            toml::from_str(content).map_err(|source| ManifestError::Parse { source })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load the manifest from `<dir>/gantry.toml`
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(ManifestError::NotFound { path });
        }
        let content =
            filesystem::read_file(&path).map_err(|source| ManifestError::Read { source })?;
        Self::from_toml(&content)
    }

    /// Find a task declaration by name
    pub fn task(&self, name: &str) -> Option<&TaskDecl> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Referential validation across sections
    fn validate(&self) -> Result<(), ManifestError> {
        let mut project_paths = HashSet::new();
        for decl in &self.projects {
            if !project_paths.insert(decl.path.as_str()) {
                return Err(ManifestError::DuplicateProject {
                    path: decl.path.clone(),
                });
            }
        }
        for decl in &self.projects {
            for dependency in &decl.evaluate_after {
                // A project may wait on any declared project, including an
                // ancestor of another declaration; only fully unknown paths
                // are rejected.
                if !project_paths.contains(dependency.as_str())
                    && !is_ancestor_of_any(dependency, &project_paths)
                {
                    return Err(ManifestError::UnknownEvaluationDependency {
                        project: decl.path.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            if !task_names.insert(task.name.as_str()) {
                return Err(ManifestError::DuplicateTask {
                    name: task.name.clone(),
                });
            }
        }
        for task in &self.tasks {
            for dependency in &task.depends_on {
                if !task_names.contains(dependency.as_str()) {
                    return Err(ManifestError::UnknownTaskDependency {
                        task: task.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        for rule in &self.actions {
            if let (Some(project), Some(pattern)) = (&rule.project, &rule.pattern) {
                return Err(ManifestError::ActionMatcherConflict {
                    project: project.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
        Ok(())
    }
}

fn is_ancestor_of_any(path: &str, declared: &HashSet<&str>) -> bool {
    declared
        .iter()
        .any(|p| p.starts_with(path) && p[path.len()..].starts_with(':'))
}

/// Substitute environment variables in a string using ${VAR} syntax
///
/// Every referenced variable must be set; an unset variable is an error
/// rather than an empty substitution.
pub fn substitute_env_vars(input: &str) -> Result<String, ManifestError> {
    // The pattern is fixed, so compilation cannot fail at runtime.
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("env var pattern is valid");

    let mut last_end = 0;
    let mut output = String::new();
    for cap in re.captures_iter(input) {
        let full = cap.get(0).expect("capture group 0 always present");
        let name = &cap[1];
        let value = std::env::var(name).map_err(|_| ManifestError::MissingEnvVar {
            name: name.to_string(),
        })?;
        output.push_str(&input[last_end..full.start()]);
        output.push_str(&value);
        last_end = full.end();
    }
    output.push_str(&input[last_end..]);
    Ok(output)
}
