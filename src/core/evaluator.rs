//! Project evaluation scheduling
//!
//! Walks the evaluation graph in dependency order and configures each
//! project exactly once: derived properties first, then matching action
//! rules, then any deferred actions queued against the project. A
//! configuration failure poisons only the failing project's dependents;
//! independent subtrees still evaluate. Nothing executes tasks until the
//! whole tree evaluated cleanly.

use std::collections::{HashMap, HashSet};

use toml::Value;

use crate::config::defaults::BUILD_DIR_PROPERTY;
use crate::core::actions::ActionRegistry;
use crate::core::graph::DependencyGraph;
use crate::core::layout::BuildLayout;
use crate::core::project::{EvalState, ProjectId, ProjectRegistry};
use crate::error::{EvaluationError, GraphError};
use crate::event::{BuildEvent, EventSink};

/// Work bound to a project, run once the project is Evaluated
pub type DeferredAction = Box<dyn FnOnce(&mut crate::core::project::Project) -> Result<(), String>>;

/// Outcome of evaluating the whole project tree
#[derive(Debug, Default)]
pub struct EvaluationReport {
    /// Projects that reached Evaluated, in evaluation order
    pub evaluated: Vec<String>,

    /// Projects skipped because a dependency failed
    pub skipped: Vec<String>,

    /// Configuration failures, in evaluation order
    pub failures: Vec<EvaluationError>,
}

impl EvaluationReport {
    /// Whether every project evaluated cleanly
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Drives the per-project configuration state machine
pub struct Evaluator<'a> {
    registry: &'a mut ProjectRegistry,
    actions: &'a ActionRegistry,
    layout: &'a BuildLayout,
    sink: &'a dyn EventSink,
    deferred: HashMap<ProjectId, Vec<DeferredAction>>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over a registry
    pub fn new(
        registry: &'a mut ProjectRegistry,
        actions: &'a ActionRegistry,
        layout: &'a BuildLayout,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            registry,
            actions,
            layout,
            sink,
            deferred: HashMap::new(),
        }
    }

    /// Register work to run once `target` reaches Evaluated
    ///
    /// Runs immediately when the target is already Evaluated; otherwise the
    /// action is queued and flushed, in registration order, on the
    /// transition. Either way it runs exactly once.
    pub fn defer(
        &mut self,
        target: ProjectId,
        action: DeferredAction,
    ) -> Result<(), EvaluationError> {
        if self.registry.project(target).state() == EvalState::Evaluated {
            let project = self.registry.project_mut(target);
            let display = project.display_path().to_string();
            return action(project).map_err(|error| EvaluationError::Configuration {
                project: display,
                error,
            });
        }
        self.deferred.entry(target).or_default().push(action);
        Ok(())
    }

    /// Evaluate every project in dependency order
    ///
    /// Fails only on a dependency cycle; configuration failures are
    /// collected in the report so independent subtrees still evaluate.
    pub fn evaluate_all(
        &mut self,
        graph: &DependencyGraph,
    ) -> Result<EvaluationReport, GraphError> {
        let order = graph.compute_order()?;
        let mut report = EvaluationReport::default();
        let mut poisoned: HashSet<String> = HashSet::new();

        for name in &order {
            let Some(id) = self.lookup(name) else {
                continue;
            };
            if graph
                .dependencies(name)
                .iter()
                .any(|dep| poisoned.contains(*dep))
            {
                poisoned.insert(name.clone());
                report.skipped.push(name.clone());
                continue;
            }
            let dep_ids: Vec<ProjectId> = graph
                .dependencies(name)
                .iter()
                .filter_map(|dep| self.lookup(dep))
                .collect();
            match self.evaluate(id, &dep_ids) {
                Ok(()) => report.evaluated.push(name.clone()),
                Err(err) => {
                    tracing::error!("{err}");
                    report.failures.push(err);
                    poisoned.insert(name.clone());
                }
            }
        }
        Ok(report)
    }

    /// Evaluate a single project whose dependencies are given
    pub fn evaluate(
        &mut self,
        id: ProjectId,
        dependencies: &[ProjectId],
    ) -> Result<(), EvaluationError> {
        let display = self.registry.project(id).display_path().to_string();
        match self.registry.project(id).state() {
            EvalState::Evaluated => return Ok(()),
            EvalState::Evaluating => {
                return Err(EvaluationError::DependencyCycle { project: display })
            }
            EvalState::Unevaluated => {}
        }
        for &dep in dependencies {
            if self.registry.project(dep).state() != EvalState::Evaluated {
                return Err(EvaluationError::DependencyNotEvaluated {
                    project: display,
                    dependency: self.registry.project(dep).display_path().to_string(),
                });
            }
        }

        let path = self.registry.project(id).path().to_string();
        let build_dir = self.layout.project_dir(&path);
        let actions = self.actions;
        let sink = self.sink;

        let project = self.registry.project_mut(id);
        project.set_state(EvalState::Evaluating);
        project.set_property(
            BUILD_DIR_PROPERTY,
            Value::String(build_dir.display().to_string()),
        );
        actions.apply_to(project, sink);
        project.set_state(EvalState::Evaluated);

        if let Some(queue) = self.deferred.remove(&id) {
            for action in queue {
                let project = self.registry.project_mut(id);
                action(project).map_err(|error| EvaluationError::Configuration {
                    project: display.clone(),
                    error,
                })?;
            }
        }

        sink.emit(&BuildEvent::ProjectEvaluated { project: display });
        Ok(())
    }

    fn lookup(&self, graph_name: &str) -> Option<ProjectId> {
        let path = if graph_name == ":" { "" } else { graph_name };
        self.registry.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::BuildConfig;
    use crate::core::project::Namespaced;
    use crate::event::CollectingSink;
    use std::path::Path;

    struct Fixture {
        registry: ProjectRegistry,
        actions: ActionRegistry,
        layout: BuildLayout,
        graph: DependencyGraph,
    }

    impl Fixture {
        fn new(paths: &[&str], eval_deps: &[(&str, &str)]) -> Self {
            let mut registry = ProjectRegistry::new();
            let mut graph = DependencyGraph::new();
            graph.add_node(":");
            for path in paths {
                registry.register(path).unwrap();
            }
            // Graph nodes cover materialized intermediates too, each
            // evaluating after its parent.
            let parents: Vec<(String, Option<String>)> = registry
                .ids()
                .map(|id| {
                    let p = registry.project(id);
                    (
                        p.display_path().to_string(),
                        p.parent().map(|pid| {
                            registry.project(pid).display_path().to_string()
                        }),
                    )
                })
                .collect();
            for (name, parent) in &parents {
                graph.add_node(name);
                if let Some(parent) = parent {
                    graph.add_edge(name, parent).unwrap();
                }
            }
            for (dependent, dependency) in eval_deps {
                graph.add_edge(dependent, dependency).unwrap();
            }
            Self {
                registry,
                actions: ActionRegistry::default(),
                layout: BuildLayout::new(Path::new("/work"), &BuildConfig::default()).unwrap(),
                graph,
            }
        }
    }

    #[test]
    fn test_evaluate_all_orders_dependencies_first() {
        let mut fx = Fixture::new(&["app", "lib"], &[("app", "lib")]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);

        let report = evaluator.evaluate_all(&fx.graph).unwrap();

        assert!(report.is_success());
        assert_eq!(report.evaluated, vec![":", "lib", "app"]);
    }

    #[test]
    fn test_evaluation_sets_build_dir_property() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);

        evaluator.evaluate_all(&fx.graph).unwrap();

        let id = fx.registry.get("app").unwrap();
        assert_eq!(
            fx.registry
                .project(id)
                .property(BUILD_DIR_PROPERTY)
                .and_then(Value::as_str),
            Some("/work/build/app")
        );
    }

    #[test]
    fn test_deferred_action_queued_then_flushed_on_transition() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        let id = evaluator.registry.get("app").unwrap();

        evaluator
            .defer(
                id,
                Box::new(|p| {
                    p.set_namespace("queued");
                    Ok(())
                }),
            )
            .unwrap();
        // Not yet evaluated, so nothing ran.
        assert_eq!(evaluator.registry.project(id).namespace(), None);

        evaluator.evaluate_all(&fx.graph).unwrap();

        assert_eq!(fx.registry.project(id).namespace(), Some("queued"));
    }

    #[test]
    fn test_deferred_action_runs_immediately_when_already_evaluated() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        evaluator.evaluate_all(&fx.graph).unwrap();
        let id = evaluator.registry.get("app").unwrap();

        evaluator
            .defer(
                id,
                Box::new(|p| {
                    p.set_namespace("immediate");
                    Ok(())
                }),
            )
            .unwrap();

        assert_eq!(
            evaluator.registry.project(id).namespace(),
            Some("immediate")
        );
    }

    #[test]
    fn test_deferred_actions_flush_in_registration_order() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        let id = evaluator.registry.get("app").unwrap();

        evaluator
            .defer(id, Box::new(|p| {
                p.set_property("order", Value::String("first".into()));
                Ok(())
            }))
            .unwrap();
        evaluator
            .defer(id, Box::new(|p| {
                p.set_property("order", Value::String("second".into()));
                Ok(())
            }))
            .unwrap();
        evaluator.evaluate_all(&fx.graph).unwrap();

        assert_eq!(
            fx.registry
                .project(fx.registry.get("app").unwrap())
                .property("order")
                .and_then(Value::as_str),
            Some("second")
        );
    }

    #[test]
    fn test_guarded_deferred_action_is_idempotent() {
        let mut fx = Fixture::new(&["printer"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        evaluator.evaluate_all(&fx.graph).unwrap();
        let id = evaluator.registry.get("printer").unwrap();
        evaluator.registry.project_mut(id).set_namespace("kept");

        let guard = |p: &mut crate::core::project::Project| -> Result<(), String> {
            if p.namespace().is_none() {
                p.set_namespace("patched");
            }
            Ok(())
        };
        evaluator.defer(id, Box::new(guard)).unwrap();
        evaluator.defer(id, Box::new(guard)).unwrap();

        assert_eq!(evaluator.registry.project(id).namespace(), Some("kept"));
    }

    #[test]
    fn test_failure_poisons_dependents_but_not_siblings() {
        let mut fx = Fixture::new(&["base", "child", "other"], &[("child", "base")]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        let base = evaluator.registry.get("base").unwrap();
        evaluator
            .defer(base, Box::new(|_| Err("boom".to_string())))
            .unwrap();

        let report = evaluator.evaluate_all(&fx.graph).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped, vec!["child"]);
        assert!(report.evaluated.contains(&"other".to_string()));
    }

    #[test]
    fn test_reentrant_evaluation_is_a_cycle_error() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        let id = evaluator.registry.get("app").unwrap();
        evaluator
            .registry
            .project_mut(id)
            .set_state(EvalState::Evaluating);

        let err = evaluator.evaluate(id, &[]).unwrap_err();

        assert_eq!(
            err,
            EvaluationError::DependencyCycle {
                project: "app".to_string()
            }
        );
    }

    #[test]
    fn test_evaluate_requires_dependencies_evaluated() {
        let mut fx = Fixture::new(&["app", "lib"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);
        let app = evaluator.registry.get("app").unwrap();
        let lib = evaluator.registry.get("lib").unwrap();

        let err = evaluator.evaluate(app, &[lib]).unwrap_err();

        assert!(matches!(
            err,
            EvaluationError::DependencyNotEvaluated { .. }
        ));
    }

    #[test]
    fn test_events_emitted_per_evaluated_project() {
        let mut fx = Fixture::new(&["app"], &[]);
        let sink = CollectingSink::new();
        let mut evaluator =
            Evaluator::new(&mut fx.registry, &fx.actions, &fx.layout, &sink);

        evaluator.evaluate_all(&fx.graph).unwrap();

        let events = sink.events();
        assert!(events.contains(&BuildEvent::ProjectEvaluated {
            project: ":".to_string()
        }));
        assert!(events.contains(&BuildEvent::ProjectEvaluated {
            project: "app".to_string()
        }));
    }
}
