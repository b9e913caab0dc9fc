//! Task model and built-in task actions
//!
//! A task pairs a name and dependency list with one of a small set of
//! built-in actions. Actions only touch the filesystem through
//! [`crate::infra::filesystem`] and release anything they open on every
//! exit path.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::defaults::DEFAULT_STAMP_FILE;
use crate::core::clean;
use crate::core::layout::BuildLayout;
use crate::core::manifest::substitute_env_vars;
use crate::error::TaskError;
use crate::infra::filesystem;

/// Execution lifecycle of a task within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Not reached yet
    #[default]
    Pending,
    /// Action currently running
    Running,
    /// Action completed; never re-run within the same invocation
    Succeeded,
    /// Action failed
    Failed,
    /// Not run because a dependency failed or the run was aborted
    Skipped,
}

/// A task declaration from the manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDecl {
    /// Task name
    pub name: String,

    /// Names of tasks that must succeed first
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// The action to run
    #[serde(flatten)]
    pub kind: TaskKind,
}

/// Built-in task actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Remove the build output root
    Clean,

    /// Remove an arbitrary path below the invocation directory
    Delete {
        /// Path to remove, relative to the invocation directory
        path: String,
    },

    /// Create every project's output directory
    Prepare,

    /// Write a timestamp stamp file under the output root
    Stamp {
        /// Stamp file name; defaults to gantry.stamp
        #[serde(default)]
        file: Option<String>,
    },

    /// Run an external command
    Exec {
        /// Program to run
        command: String,

        /// Arguments passed to the program
        #[serde(default)]
        args: Vec<String>,

        /// Working directory, relative to the invocation directory
        #[serde(default)]
        cwd: Option<String>,
    },

    /// No action; exists only to aggregate dependencies
    Group,
}

/// Per-invocation execution environment shared by all tasks
#[derive(Debug)]
pub struct ExecutionEnv<'a> {
    /// Directory the build was invoked from
    pub project_dir: &'a Path,

    /// Output layout
    pub layout: &'a BuildLayout,

    /// All project paths in declaration order, root first
    pub project_paths: Vec<String>,
}

/// Context handed to a single task action
#[derive(Debug)]
pub struct TaskContext<'a> {
    /// Name of the running task
    pub task: &'a str,

    /// Shared environment
    pub env: &'a ExecutionEnv<'a>,
}

impl TaskKind {
    /// Run the action
    pub fn execute(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        match self {
            Self::Clean => {
                clean::clean_output(ctx.env.layout).map_err(|e| failed(ctx, &e))?;
                Ok(())
            }
            Self::Delete { path } => {
                let resolved = substitute_env_vars(path).map_err(|e| failed(ctx, &e))?;
                let target = ctx.env.project_dir.join(resolved);
                remove_path(&target).map_err(|e| failed(ctx, &e))?;
                Ok(())
            }
            Self::Prepare => {
                for path in &ctx.env.project_paths {
                    let dir = ctx.env.layout.project_dir(path);
                    filesystem::create_dir_all(&dir).map_err(|e| failed(ctx, &e))?;
                }
                Ok(())
            }
            Self::Stamp { file } => {
                let name = file.as_deref().unwrap_or(DEFAULT_STAMP_FILE);
                let path = ctx.env.layout.stamps_dir().join(name);
                filesystem::write_file(&path, &unix_timestamp()).map_err(|e| failed(ctx, &e))?;
                Ok(())
            }
            Self::Exec { command, args, cwd } => exec_command(ctx, command, args, cwd.as_deref()),
            Self::Group => Ok(()),
        }
    }

    /// Short human-readable label for reports
    pub fn describe(&self) -> String {
        match self {
            Self::Clean => "clean".to_string(),
            Self::Delete { path } => format!("delete {path}"),
            Self::Prepare => "prepare".to_string(),
            Self::Stamp { .. } => "stamp".to_string(),
            Self::Exec { command, .. } => format!("exec {command}"),
            Self::Group => "group".to_string(),
        }
    }
}

/// Remove a file or directory tree; missing paths are fine
fn remove_path(path: &Path) -> Result<(), crate::error::FilesystemError> {
    if path.is_file() {
        filesystem::remove_file(path)?;
    } else {
        filesystem::remove_dir_all(path)?;
    }
    Ok(())
}

fn exec_command(
    ctx: &TaskContext<'_>,
    command: &str,
    args: &[String],
    cwd: Option<&str>,
) -> Result<(), TaskError> {
    let program = substitute_env_vars(command).map_err(|e| failed(ctx, &e))?;
    let mut cmd = Command::new(&program);
    for arg in args {
        cmd.arg(substitute_env_vars(arg).map_err(|e| failed(ctx, &e))?);
    }
    let workdir: PathBuf = match cwd {
        Some(dir) => {
            let resolved = substitute_env_vars(dir).map_err(|e| failed(ctx, &e))?;
            ctx.env.project_dir.join(resolved)
        }
        None => ctx.env.project_dir.to_path_buf(),
    };
    cmd.current_dir(workdir);

    let status = cmd.status().map_err(|e| TaskError::CommandSpawn {
        command: program.clone(),
        error: e.to_string(),
    })?;
    if !status.success() {
        return Err(TaskError::CommandFailed {
            command: program,
            status: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

fn failed(ctx: &TaskContext<'_>, error: &dyn std::fmt::Display) -> TaskError {
    TaskError::Failed {
        task: ctx.task.to_string(),
        error: error.to_string(),
    }
}

/// Seconds since the Unix epoch, for stamp files
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}
