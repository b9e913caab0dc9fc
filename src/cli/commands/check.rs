//! CLI implementation for the `gantry check` command
//!
//! Validates the whole configuration (projects, actions, task graph)
//! without executing any task.

use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::output::{create_spinner, status};
use crate::core::check::check_configuration;
use crate::event::{EventSink, JsonSink, TracingSink};

/// Execute the check command
pub async fn execute(project_dir: &Path, json: bool) -> Result<()> {
    let sink: Box<dyn EventSink> = if json {
        Box::new(JsonSink)
    } else {
        Box::new(TracingSink)
    };

    let spinner = (!json).then(|| create_spinner("Evaluating projects"));
    let result = check_configuration(project_dir, sink.as_ref());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = result?;
    if report.is_success() {
        println!(
            "{} Configuration valid: {} projects, {} tasks",
            status::SUCCESS,
            report.projects,
            report.tasks
        );
        return Ok(());
    }

    for failure in &report.evaluation.failures {
        eprintln!("{} {failure}", status::ERROR);
    }
    for skipped in &report.evaluation.skipped {
        eprintln!("  Skipped '{skipped}' (dependency failed to configure)");
    }
    bail!(
        "configuration check failed for {} project(s)",
        report.evaluation.failures.len() + report.evaluation.skipped.len()
    );
}
