//! Configuration validation
//!
//! Builds the full workspace, evaluates every project, and verifies the
//! task graph, without executing a single task.

use std::path::Path;

use crate::core::evaluator::EvaluationReport;
use crate::core::executor::TaskExecutor;
use crate::core::workspace::Workspace;
use crate::error::GantryError;
use crate::event::EventSink;

/// Result of a configuration check
#[derive(Debug)]
pub struct CheckReport {
    /// Number of projects in the tree, root included
    pub projects: usize,

    /// Number of declared tasks
    pub tasks: usize,

    /// Evaluation outcome
    pub evaluation: EvaluationReport,
}

impl CheckReport {
    /// Whether the configuration is fully usable
    pub fn is_success(&self) -> bool {
        self.evaluation.is_success()
    }
}

/// Validate the configuration in `project_dir`
pub fn check_configuration(
    project_dir: &Path,
    sink: &dyn EventSink,
) -> Result<CheckReport, GantryError> {
    let mut workspace = Workspace::load(project_dir)?;
    let evaluation = workspace.evaluate(sink)?;
    let executor = TaskExecutor::new(&workspace.manifest.tasks)?;
    executor.validate()?;
    Ok(CheckReport {
        projects: workspace.registry.len(),
        tasks: workspace.manifest.tasks.len(),
        evaluation,
    })
}
