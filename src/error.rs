//! Error types for gantry
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Dependency graph errors
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    /// Dependency declarations form a cycle
    #[error("Dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// Edge references a node that was never declared
    #[error("Unknown node '{name}' referenced by '{referenced_by}'")]
    UnknownNode { name: String, referenced_by: String },

    /// Node depends on itself
    #[error("Node '{name}' cannot depend on itself")]
    SelfDependency { name: String },
}

/// Manifest (gantry.toml) errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file missing
    #[error("Manifest not found at '{path}'. Run 'gantry init' to create a project.")]
    NotFound { path: PathBuf },

    /// Manifest parse error
    #[error("Failed to parse manifest: {source}")]
    Parse { source: toml::de::Error },

    /// Manifest read error
    #[error("Failed to read manifest: {source}")]
    Read {
        #[source]
        source: FilesystemError,
    },

    /// Project path is malformed
    #[error("Invalid project path '{path}': {reason}")]
    InvalidProjectPath { path: String, reason: String },

    /// Same project declared twice
    #[error("Project '{path}' is declared more than once")]
    DuplicateProject { path: String },

    /// Same task declared twice
    #[error("Task '{name}' is declared more than once")]
    DuplicateTask { name: String },

    /// evaluate_after names a project that does not exist
    #[error("Project '{project}' lists unknown evaluation dependency '{dependency}'")]
    UnknownEvaluationDependency { project: String, dependency: String },

    /// depends_on names a task that does not exist
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownTaskDependency { task: String, dependency: String },

    /// Action rule specifies both an exact project and a pattern
    #[error("Action rule may not combine project '{project}' with pattern '{pattern}' (only one matcher allowed)")]
    ActionMatcherConflict { project: String, pattern: String },

    /// ${VAR} substitution referenced an unset variable
    #[error("Environment variable '{name}' is not set")]
    MissingEnvVar { name: String },
}

/// Project evaluation errors
#[derive(Error, Debug, PartialEq)]
pub enum EvaluationError {
    /// Re-entrant evaluation of a project that is still evaluating
    #[error("Project '{project}' is already being evaluated (dependency cycle)")]
    DependencyCycle { project: String },

    /// A configuration action against the project failed
    #[error("Configuration of project '{project}' failed: {error}")]
    Configuration { project: String, error: String },

    /// Evaluation was attempted before a dependency finished
    #[error("Project '{project}' cannot evaluate before its dependency '{dependency}'")]
    DependencyNotEvaluated { project: String, dependency: String },
}

/// Configuration action errors
#[derive(Error, Debug, PartialEq)]
pub enum ActionError {
    /// Matcher pattern failed to compile; treated as a non-match by callers
    #[error("Action matcher '{pattern}' failed to compile: {error}")]
    Predicate { pattern: String, error: String },
}

/// Task execution errors
#[derive(Error, Debug, PartialEq)]
pub enum TaskError {
    /// Requested task does not exist
    #[error("Unknown task '{name}'")]
    Unknown { name: String },

    /// Task action failed
    #[error("Task '{task}' failed: {error}")]
    Failed { task: String, error: String },

    /// External command exited with a non-zero status
    #[error("Command '{command}' exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    /// External command could not be spawned
    #[error("Command '{command}' could not be started: {error}")]
    CommandSpawn { command: String, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to remove file
    #[error("Failed to remove file '{path}': {error}")]
    RemoveFile { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Project initialization errors
#[derive(Error, Debug)]
pub enum InitError {
    /// Manifest already present
    #[error("gantry.toml already exists at '{path}'. Use --force to overwrite.")]
    AlreadyInitialized { path: PathBuf },
}

/// Top-level gantry error type
#[derive(Error, Debug)]
pub enum GantryError {
    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Action error
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// Task error
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Init error
    #[error("Init error: {0}")]
    Init(#[from] InitError),
}
