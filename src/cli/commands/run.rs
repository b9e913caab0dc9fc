//! CLI implementation for the `gantry run` command
//!
//! Evaluates the project tree, plans the requested tasks, and executes
//! them. The exit code is the number of failed tasks, capped at 255.

use std::path::Path;

use anyhow::{bail, Result};
use indicatif::ProgressBar;

use crate::cli::output::{create_task_bar, status};
use crate::core::executor::{CancelFlag, ExecuteOptions, TaskExecutor};
use crate::core::workspace::Workspace;
use crate::event::{BuildEvent, EventSink, JsonSink, TracingSink};

/// Run options
pub struct RunOptions {
    /// Task names to run
    pub tasks: Vec<String>,
    /// Report the execution order without executing
    pub dry_run: bool,
    /// Keep running tasks that do not depend on a failed one
    pub continue_on_failure: bool,
    /// Emit events as JSON lines
    pub json: bool,
}

/// Forwards events while advancing a progress bar
struct ProgressSink<'a> {
    inner: &'a dyn EventSink,
    bar: &'a ProgressBar,
}

impl EventSink for ProgressSink<'_> {
    fn emit(&self, event: &BuildEvent) {
        match event {
            BuildEvent::TaskStarted { task } => self.bar.set_message(task.clone()),
            BuildEvent::TaskSucceeded { .. } | BuildEvent::TaskFailed { .. } => self.bar.inc(1),
            _ => {}
        }
        self.inner.emit(event);
    }
}

/// Execute the run command
pub async fn execute(project_dir: &Path, options: RunOptions) -> Result<i32> {
    let sink: Box<dyn EventSink> = if options.json {
        Box::new(JsonSink)
    } else {
        Box::new(TracingSink)
    };

    let mut workspace = Workspace::load(project_dir)?;
    let evaluation = workspace.evaluate(sink.as_ref())?;
    if !evaluation.is_success() {
        for failure in &evaluation.failures {
            eprintln!("{} {failure}", status::ERROR);
        }
        for skipped in &evaluation.skipped {
            eprintln!("  Skipped '{skipped}' (dependency failed to configure)");
        }
        bail!(
            "configuration failed for {} project(s); no tasks were run",
            evaluation.failures.len() + evaluation.skipped.len()
        );
    }

    let mut executor = TaskExecutor::new(&workspace.manifest.tasks)?;
    let plan = executor.plan(&options.tasks)?;

    if options.dry_run {
        println!("Execution order ({} tasks):", plan.len());
        for (i, task) in plan.iter().enumerate() {
            println!("  {}. {task}", i + 1);
        }
        return Ok(0);
    }

    let cancel = CancelFlag::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancellation requested; finishing current task");
            handler.cancel();
        }
    });

    let env = workspace.execution_env(project_dir);
    let execute_options = ExecuteOptions {
        continue_on_failure: options.continue_on_failure,
    };
    let bar = (!options.json).then(|| create_task_bar(plan.len() as u64));
    let report = match &bar {
        Some(bar) => {
            let progress = ProgressSink {
                inner: sink.as_ref(),
                bar,
            };
            executor.run(&plan, &execute_options, &env, &cancel, &progress)
        }
        None => executor.run(&plan, &execute_options, &env, &cancel, sink.as_ref()),
    };
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    if report.cancelled {
        println!("{} Run cancelled", status::WARNING);
    }
    if report.failed.is_empty() {
        println!("{} Run complete!", status::SUCCESS);
        println!("  Tasks executed: {}", report.executed.len());
    } else {
        println!("{} {} task(s) failed:", status::ERROR, report.failed.len());
        for (task, error) in &report.failed {
            println!("    {task}: {error}");
        }
    }
    if !report.skipped.is_empty() {
        println!("  Skipped: {}", report.skipped.join(", "));
    }

    Ok(report.exit_code())
}
