//! Build run assembly
//!
//! Turns a parsed manifest into the live objects a run needs: the project
//! registry, the evaluation graph, the action registry, and the output
//! layout. Every project implicitly evaluates after its parent; declared
//! `evaluate_after` edges come on top.

use std::path::Path;

use crate::core::actions::ActionRegistry;
use crate::core::evaluator::{EvaluationReport, Evaluator};
use crate::core::graph::DependencyGraph;
use crate::core::layout::BuildLayout;
use crate::core::manifest::Manifest;
use crate::core::project::ProjectRegistry;
use crate::core::task::ExecutionEnv;
use crate::error::{GantryError, GraphError};
use crate::event::EventSink;

/// Everything a build run works against
pub struct Workspace {
    /// The parsed manifest
    pub manifest: Manifest,

    /// Owner of the project tree
    pub registry: ProjectRegistry,

    /// Configuration action rules
    pub actions: ActionRegistry,

    /// Derived output paths
    pub layout: BuildLayout,

    /// Project evaluation ordering constraints
    pub eval_graph: DependencyGraph,
}

impl Workspace {
    /// Load `<dir>/gantry.toml` and assemble a workspace
    pub fn load(project_dir: &Path) -> Result<Self, GantryError> {
        let manifest = Manifest::load(project_dir)?;
        Self::from_manifest(project_dir, manifest)
    }

    /// Assemble a workspace from an already parsed manifest
    pub fn from_manifest(project_dir: &Path, manifest: Manifest) -> Result<Self, GantryError> {
        let mut registry = ProjectRegistry::new();
        for decl in &manifest.projects {
            let id = registry.register(&decl.path)?;
            for (key, value) in &decl.properties {
                registry.project_mut(id).set_property(key, value.clone());
            }
        }

        let mut eval_graph = DependencyGraph::new();
        let nodes: Vec<(String, Option<String>)> = registry
            .ids()
            .map(|id| {
                let project = registry.project(id);
                (
                    project.display_path().to_string(),
                    project
                        .parent()
                        .map(|pid| registry.project(pid).display_path().to_string()),
                )
            })
            .collect();
        for (name, parent) in &nodes {
            eval_graph.add_node(name);
            if let Some(parent) = parent {
                eval_graph.add_edge(name, parent)?;
            }
        }
        for decl in &manifest.projects {
            for dependency in &decl.evaluate_after {
                eval_graph.add_edge(&decl.path, dependency)?;
            }
        }

        let actions = ActionRegistry::from_rules(manifest.actions.clone());
        let layout = BuildLayout::new(project_dir, &manifest.build)?;
        Ok(Self {
            manifest,
            registry,
            actions,
            layout,
            eval_graph,
        })
    }

    /// Evaluate the whole project tree
    pub fn evaluate(&mut self, sink: &dyn EventSink) -> Result<EvaluationReport, GraphError> {
        let mut evaluator =
            Evaluator::new(&mut self.registry, &self.actions, &self.layout, sink);
        evaluator.evaluate_all(&self.eval_graph)
    }

    /// Shared environment for task actions
    pub fn execution_env<'a>(&'a self, project_dir: &'a Path) -> ExecutionEnv<'a> {
        ExecutionEnv {
            project_dir,
            layout: &self.layout,
            project_paths: self.registry.paths().map(str::to_string).collect(),
        }
    }
}
