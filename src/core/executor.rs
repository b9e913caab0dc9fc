//! Task execution
//!
//! Resolves the transitive dependency closure of the requested tasks and
//! runs it in topological order. Every task runs at most once per
//! invocation; a failure skips its dependents and, unless the run is told
//! to continue, everything else that has not started yet. Cancellation is
//! cooperative and only honored between task boundaries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::defaults::MAX_FAILURE_EXIT_CODE;
use crate::core::graph::DependencyGraph;
use crate::core::task::{ExecutionEnv, TaskContext, TaskDecl, TaskState};
use crate::error::{GantryError, GraphError, TaskError};
use crate::event::{BuildEvent, EventSink};

/// Knobs for a single run
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Keep running tasks that do not depend on a failed one
    pub continue_on_failure: bool,
}

/// Cooperative cancellation flag, checked between tasks
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Tasks that succeeded, in execution order
    pub executed: Vec<String>,

    /// Failed tasks with their error messages
    pub failed: Vec<(String, String)>,

    /// Tasks skipped because of failures, aborts, or cancellation
    pub skipped: Vec<String>,

    /// Whether the run was cancelled before finishing
    pub cancelled: bool,
}

impl RunReport {
    /// Whether every planned task succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.cancelled
    }

    /// Process exit code: the failed-task count, capped
    pub fn exit_code(&self) -> i32 {
        let capped = self.failed.len().min(MAX_FAILURE_EXIT_CODE);
        i32::try_from(capped).unwrap_or(i32::MAX)
    }
}

/// Runs tasks from a declaration list
pub struct TaskExecutor<'a> {
    tasks: &'a [TaskDecl],
    index: HashMap<&'a str, usize>,
    graph: DependencyGraph,
    states: Vec<TaskState>,
}

impl<'a> TaskExecutor<'a> {
    /// Build an executor over the declared tasks
    pub fn new(tasks: &'a [TaskDecl]) -> Result<Self, GraphError> {
        let mut graph = DependencyGraph::new();
        let mut index = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            graph.add_node(&task.name);
            index.insert(task.name.as_str(), i);
        }
        for task in tasks {
            for dependency in &task.depends_on {
                graph.add_edge(&task.name, dependency)?;
            }
        }
        Ok(Self {
            tasks,
            index,
            graph,
            states: vec![TaskState::default(); tasks.len()],
        })
    }

    /// Verify the whole task graph is acyclic
    pub fn validate(&self) -> Result<(), GraphError> {
        self.graph.compute_order().map(|_| ())
    }

    /// Topologically ordered transitive dependency closure of the request
    pub fn plan(&self, requested: &[String]) -> Result<Vec<String>, GantryError> {
        for name in requested {
            if !self.index.contains_key(name.as_str()) {
                return Err(TaskError::Unknown { name: name.clone() }.into());
            }
        }
        let roots: Vec<&str> = requested.iter().map(String::as_str).collect();
        Ok(self.graph.compute_order_for(&roots)?)
    }

    /// Current state of a task
    pub fn state(&self, name: &str) -> Option<TaskState> {
        self.index.get(name).map(|&i| self.states[i])
    }

    /// Execute a plan
    pub fn run(
        &mut self,
        plan: &[String],
        options: &ExecuteOptions,
        env: &ExecutionEnv<'_>,
        cancel: &CancelFlag,
        sink: &dyn EventSink,
    ) -> RunReport {
        let mut report = RunReport::default();
        let mut abort = false;

        for name in plan {
            let Some(&i) = self.index.get(name.as_str()) else {
                continue;
            };
            if self.states[i] != TaskState::Pending {
                // Already handled through another dependency path.
                continue;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                self.states[i] = TaskState::Skipped;
                report.skipped.push(name.clone());
                continue;
            }
            if abort && !options.continue_on_failure {
                self.states[i] = TaskState::Skipped;
                report.skipped.push(name.clone());
                continue;
            }
            let blocked = self.tasks[i].depends_on.iter().any(|dep| {
                self.index.get(dep.as_str()).is_some_and(|&d| {
                    matches!(self.states[d], TaskState::Failed | TaskState::Skipped)
                })
            });
            if blocked {
                self.states[i] = TaskState::Skipped;
                report.skipped.push(name.clone());
                continue;
            }

            self.states[i] = TaskState::Running;
            sink.emit(&BuildEvent::TaskStarted { task: name.clone() });
            tracing::debug!(task = %name, action = %self.tasks[i].kind.describe(), "running task");
            let ctx = TaskContext { task: name, env };
            match self.tasks[i].kind.execute(&ctx) {
                Ok(()) => {
                    self.states[i] = TaskState::Succeeded;
                    sink.emit(&BuildEvent::TaskSucceeded { task: name.clone() });
                    report.executed.push(name.clone());
                }
                Err(err) => {
                    self.states[i] = TaskState::Failed;
                    sink.emit(&BuildEvent::TaskFailed {
                        task: name.clone(),
                        error: err.to_string(),
                    });
                    report.failed.push((name.clone(), err.to_string()));
                    abort = true;
                }
            }
        }
        report
    }
}
