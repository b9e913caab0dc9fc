//! Dependency graph and ordering
//!
//! A declaration-ordered directed graph used both for project evaluation
//! order and for task execution order. Ordering is deterministic: among
//! nodes whose dependencies are all satisfied, the earliest-declared node
//! always comes first.

use std::collections::HashMap;

use crate::error::GraphError;

/// Directed dependency graph over string-named nodes
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Node names in declaration order
    nodes: Vec<String>,
    /// Name -> declaration index
    index: HashMap<String, usize>,
    /// Dependency indices per node, in edge declaration order
    deps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its declaration index
    ///
    /// Re-adding an existing node is a no-op.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.deps.push(Vec::new());
        idx
    }

    /// Record that `dependent` must come after `dependency`
    pub fn add_edge(&mut self, dependent: &str, dependency: &str) -> Result<(), GraphError> {
        if dependent == dependency {
            return Err(GraphError::SelfDependency {
                name: dependent.to_string(),
            });
        }
        let idx = *self
            .index
            .get(dependent)
            .ok_or_else(|| GraphError::UnknownNode {
                name: dependent.to_string(),
                referenced_by: dependency.to_string(),
            })?;
        let dep_idx = *self
            .index
            .get(dependency)
            .ok_or_else(|| GraphError::UnknownNode {
                name: dependency.to_string(),
                referenced_by: dependent.to_string(),
            })?;
        if !self.deps[idx].contains(&dep_idx) {
            self.deps[idx].push(dep_idx);
        }
        Ok(())
    }

    /// Whether the graph contains a node with this name
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a node, in edge declaration order
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        match self.index.get(name) {
            Some(&idx) => self.deps[idx]
                .iter()
                .map(|&d| self.nodes[d].as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Compute a topological order over all nodes
    ///
    /// Dependencies always precede their dependents; unconstrained nodes
    /// appear in declaration order. Fails with one concrete cycle when the
    /// graph is not acyclic; never returns a partial order.
    pub fn compute_order(&self) -> Result<Vec<String>, GraphError> {
        let all: Vec<usize> = (0..self.nodes.len()).collect();
        self.order_subset(&all)
    }

    /// Compute a topological order over the transitive dependency closure
    /// of the given roots
    pub fn compute_order_for(&self, roots: &[&str]) -> Result<Vec<String>, GraphError> {
        let mut wanted = vec![false; self.nodes.len()];
        let mut stack = Vec::new();
        for root in roots {
            let idx = *self
                .index
                .get(*root)
                .ok_or_else(|| GraphError::UnknownNode {
                    name: (*root).to_string(),
                    referenced_by: "<request>".to_string(),
                })?;
            stack.push(idx);
        }
        while let Some(idx) = stack.pop() {
            if wanted[idx] {
                continue;
            }
            wanted[idx] = true;
            stack.extend(self.deps[idx].iter().copied());
        }
        let subset: Vec<usize> = (0..self.nodes.len()).filter(|&i| wanted[i]).collect();
        self.order_subset(&subset)
    }

    /// Kahn-style walk restricted to `subset`, always selecting the ready
    /// node with the lowest declaration index. The linear scan keeps the
    /// tie-break rule obvious; graphs here are project/task sized.
    fn order_subset(&self, subset: &[usize]) -> Result<Vec<String>, GraphError> {
        let mut in_subset = vec![false; self.nodes.len()];
        for &idx in subset {
            in_subset[idx] = true;
        }
        let mut done = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(subset.len());
        while order.len() < subset.len() {
            let next = subset.iter().copied().find(|&idx| {
                !done[idx]
                    && self.deps[idx]
                        .iter()
                        .all(|&d| !in_subset[d] || done[d])
            });
            match next {
                Some(idx) => {
                    done[idx] = true;
                    order.push(self.nodes[idx].clone());
                }
                None => {
                    return Err(GraphError::CycleDetected {
                        cycle: self.find_cycle(subset, &done),
                    })
                }
            }
        }
        Ok(order)
    }

    /// Extract one concrete cycle among the unfinished nodes
    fn find_cycle(&self, subset: &[usize], done: &[bool]) -> Vec<String> {
        let mut in_subset = vec![false; self.nodes.len()];
        for &idx in subset {
            in_subset[idx] = true;
        }
        for &start in subset {
            if done[start] {
                continue;
            }
            let mut path = Vec::new();
            let mut on_path = vec![false; self.nodes.len()];
            if let Some(cycle) = self.walk_cycle(start, done, &in_subset, &mut path, &mut on_path) {
                return cycle;
            }
        }
        Vec::new()
    }

    fn walk_cycle(
        &self,
        node: usize,
        done: &[bool],
        in_subset: &[bool],
        path: &mut Vec<usize>,
        on_path: &mut [bool],
    ) -> Option<Vec<String>> {
        if on_path[node] {
            let pos = path.iter().position(|&n| n == node).unwrap_or(0);
            let mut cycle: Vec<String> =
                path[pos..].iter().map(|&n| self.nodes[n].clone()).collect();
            cycle.push(self.nodes[node].clone());
            return Some(cycle);
        }
        if done[node] {
            return None;
        }
        on_path[node] = true;
        path.push(node);
        for &dep in &self.deps[node] {
            if in_subset[dep] {
                if let Some(cycle) = self.walk_cycle(dep, done, in_subset, path, on_path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        on_path[node] = false;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (dependent, dependency) in edges {
            graph.add_edge(dependent, dependency).unwrap();
        }
        graph
    }

    #[test]
    fn test_simple_dependency_order() {
        let graph = graph_of(&["app", "lib"], &[("app", "lib")]);

        let order = graph.compute_order().unwrap();

        assert_eq!(order, vec!["lib", "app"]);
    }

    #[test]
    fn test_declaration_order_tie_break() {
        let graph = graph_of(
            &["app", "lib-a", "lib-b"],
            &[("app", "lib-a"), ("app", "lib-b")],
        );

        let order = graph.compute_order().unwrap();

        // lib-a and lib-b are unconstrained relative to each other;
        // declaration order decides.
        assert_eq!(order, vec!["lib-a", "lib-b", "app"]);
    }

    #[test]
    fn test_unconstrained_nodes_keep_declaration_order() {
        let graph = graph_of(&["b", "a", "c"], &[]);

        let order = graph.compute_order().unwrap();

        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_detection_names_the_cycle() {
        let graph = graph_of(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
        );

        let err = graph.compute_order().unwrap_err();

        match err {
            GraphError::CycleDetected { cycle } => {
                assert!(cycle.len() >= 3, "cycle should name its members: {cycle:?}");
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_never_returns_partial_order() {
        // Acyclic prefix plus a two-node cycle at the end.
        let graph = graph_of(
            &["ok", "x", "y"],
            &[("x", "y"), ("y", "x")],
        );

        assert!(graph.compute_order().is_err());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a");

        let err = graph.add_edge("a", "a").unwrap_err();

        assert_eq!(
            err,
            GraphError::SelfDependency {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a");

        let err = graph.add_edge("a", "ghost").unwrap_err();

        assert!(matches!(err, GraphError::UnknownNode { .. }));
    }

    #[test]
    fn test_closure_restricts_to_requested_roots() {
        let graph = graph_of(
            &["assemble", "compile", "clean", "stamp"],
            &[("assemble", "compile"), ("stamp", "compile")],
        );

        let order = graph.compute_order_for(&["assemble"]).unwrap();

        assert_eq!(order, vec!["compile", "assemble"]);
    }

    #[test]
    fn test_closure_with_shared_dependency_lists_it_once() {
        let graph = graph_of(
            &["a", "b", "shared"],
            &[("a", "shared"), ("b", "shared")],
        );

        let order = graph.compute_order_for(&["a", "b"]).unwrap();

        assert_eq!(order, vec!["shared", "a", "b"]);
    }

    #[test]
    fn test_duplicate_edge_is_ignored() {
        let mut graph = graph_of(&["app", "lib"], &[("app", "lib")]);
        graph.add_edge("app", "lib").unwrap();

        assert_eq!(graph.dependencies("app"), vec!["lib"]);
    }

    proptest! {
        /// Random acyclic graphs (edges only point at earlier declarations)
        /// always order every dependency before its dependent.
        #[test]
        fn prop_dependencies_precede_dependents(
            n in 2usize..12,
            edge_seed in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let names: Vec<String> = (0..n).map(|i| format!("node{i}")).collect();
            let mut graph = DependencyGraph::new();
            for name in &names {
                graph.add_node(name);
            }
            for (a, b) in edge_seed {
                let (hi, lo) = (a % n, b % n);
                if hi > lo {
                    graph.add_edge(&names[hi], &names[lo]).unwrap();
                }
            }

            let order = graph.compute_order().unwrap();
            prop_assert_eq!(order.len(), n);
            let pos: std::collections::HashMap<&str, usize> =
                order.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
            for name in &names {
                for dep in graph.dependencies(name) {
                    prop_assert!(pos[dep] < pos[name.as_str()]);
                }
            }
        }
    }
}
