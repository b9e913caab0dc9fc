//! Project and task tree rendering

use std::fmt::Write as _;

use crate::core::project::ProjectId;
use crate::core::workspace::Workspace;

/// Render the project tree and task list as indented text
pub fn render_tree(workspace: &Workspace) -> String {
    let mut out = String::new();
    out.push_str("Projects:\n");
    render_project(workspace, workspace.registry.root(), 1, &mut out);

    out.push_str("\nTasks:\n");
    if workspace.manifest.tasks.is_empty() {
        out.push_str("  (none)\n");
    }
    for task in &workspace.manifest.tasks {
        if task.depends_on.is_empty() {
            let _ = writeln!(out, "  {}", task.name);
        } else {
            let _ = writeln!(
                out,
                "  {} (depends on: {})",
                task.name,
                task.depends_on.join(", ")
            );
        }
    }
    out
}

fn render_project(workspace: &Workspace, id: ProjectId, depth: usize, out: &mut String) {
    let project = workspace.registry.project(id);
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), project.display_path());
    for &child in project.children() {
        render_project(workspace, child, depth + 1, out);
    }
}

/// Render the task graph in DOT format
pub fn render_dot(workspace: &Workspace) -> String {
    let mut out = String::new();
    out.push_str("digraph tasks {\n");
    for task in &workspace.manifest.tasks {
        let _ = writeln!(out, "    \"{}\";", task.name);
        for dependency in &task.depends_on {
            let _ = writeln!(out, "    \"{dependency}\" -> \"{}\";", task.name);
        }
    }
    out.push_str("}\n");
    out
}
