//! Project tree and registry
//!
//! Projects are declared once at registry construction and live for the
//! whole run. The registry is the sole owner; everything else refers to a
//! project through a copyable [`ProjectId`].

use std::collections::HashMap;

use toml::Value;

use crate::error::ManifestError;

/// Property key backing the [`Namespaced`] capability
pub const NAMESPACE_PROPERTY: &str = "namespace";

/// Handle to a project inside a [`ProjectRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectId(pub(crate) usize);

/// Configuration lifecycle of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalState {
    /// Not yet configured
    #[default]
    Unevaluated,
    /// Configuration actions are currently running
    Evaluating,
    /// Configuration finished; terminal
    Evaluated,
}

/// A node in the project tree
#[derive(Debug)]
pub struct Project {
    path: String,
    parent: Option<ProjectId>,
    children: Vec<ProjectId>,
    properties: HashMap<String, Value>,
    state: EvalState,
}

impl Project {
    fn new(path: String, parent: Option<ProjectId>) -> Self {
        Self {
            path,
            parent,
            children: Vec::new(),
            properties: HashMap::new(),
            state: EvalState::Unevaluated,
        }
    }

    /// Colon-separated path; empty for the root project
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path as shown to users; the root project displays as ":"
    pub fn display_path(&self) -> &str {
        if self.path.is_empty() {
            ":"
        } else {
            &self.path
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit(':').next().unwrap_or(&self.path)
    }

    /// Parent project, if any
    pub fn parent(&self) -> Option<ProjectId> {
        self.parent
    }

    /// Child projects in declaration order
    pub fn children(&self) -> &[ProjectId] {
        &self.children
    }

    /// Current evaluation state
    pub fn state(&self) -> EvalState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: EvalState) {
        self.state = state;
    }

    /// Look up a property value
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Set a property, overwriting any existing value
    ///
    /// Overwrites are naturally idempotent: applying the same value twice
    /// leaves the bag in the same state as applying it once.
    pub fn set_property(&mut self, key: &str, value: Value) {
        self.properties.insert(key.to_string(), value);
    }

    /// Set a property only when the key is currently unset
    ///
    /// Returns `true` when the value was written.
    pub fn ensure_property(&mut self, key: &str, value: Value) -> bool {
        if self.properties.contains_key(key) {
            return false;
        }
        self.properties.insert(key.to_string(), value);
        true
    }

}

/// Explicit capability for the well-known namespace attribute
///
/// Every project-like configuration object exposes this interface; callers
/// use it directly instead of looking methods up by name at runtime.
pub trait Namespaced {
    /// The namespace, when one is set
    fn namespace(&self) -> Option<&str>;

    /// Set the namespace, overwriting any existing value
    fn set_namespace(&mut self, value: &str);
}

impl Namespaced for Project {
    fn namespace(&self) -> Option<&str> {
        self.properties
            .get(NAMESPACE_PROPERTY)
            .and_then(Value::as_str)
    }

    fn set_namespace(&mut self, value: &str) {
        self.properties.insert(
            NAMESPACE_PROPERTY.to_string(),
            Value::String(value.to_string()),
        );
    }
}

/// Owner of the project tree
///
/// Projects are stored in declaration order; the root project is always
/// present at index zero.
#[derive(Debug)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
    index: HashMap<String, ProjectId>,
}

impl ProjectRegistry {
    /// Create a registry containing only the root project
    pub fn new() -> Self {
        let root = Project::new(String::new(), None);
        let mut index = HashMap::new();
        index.insert(String::new(), ProjectId(0));
        Self {
            projects: vec![root],
            index,
        }
    }

    /// Handle to the root project
    pub fn root(&self) -> ProjectId {
        ProjectId(0)
    }

    /// Register a project path, materializing intermediate parents
    ///
    /// Registering an existing path returns the existing handle.
    pub fn register(&mut self, path: &str) -> Result<ProjectId, ManifestError> {
        validate_path(path)?;
        let mut parent = self.root();
        let mut accumulated = String::new();
        for segment in path.split(':') {
            if accumulated.is_empty() {
                accumulated.push_str(segment);
            } else {
                accumulated.push(':');
                accumulated.push_str(segment);
            }
            parent = match self.index.get(&accumulated) {
                Some(&id) => id,
                None => {
                    let id = ProjectId(self.projects.len());
                    self.projects
                        .push(Project::new(accumulated.clone(), Some(parent)));
                    self.index.insert(accumulated.clone(), id);
                    self.projects[parent.0].children.push(id);
                    id
                }
            };
        }
        Ok(parent)
    }

    /// Look up a project by path
    pub fn get(&self, path: &str) -> Option<ProjectId> {
        self.index.get(path).copied()
    }

    /// Borrow a project
    pub fn project(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    /// Mutably borrow a project
    pub fn project_mut(&mut self, id: ProjectId) -> &mut Project {
        &mut self.projects[id.0]
    }

    /// Number of projects, root included
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether only the root project exists
    pub fn is_empty(&self) -> bool {
        self.projects.len() <= 1
    }

    /// Project handles in declaration order
    pub fn ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        (0..self.projects.len()).map(ProjectId)
    }

    /// Project paths in declaration order, root first
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(Project::path)
    }
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_path(path: &str) -> Result<(), ManifestError> {
    if path.is_empty() {
        return Err(ManifestError::InvalidProjectPath {
            path: path.to_string(),
            reason: "path is empty".to_string(),
        });
    }
    for segment in path.split(':') {
        if segment.is_empty() {
            return Err(ManifestError::InvalidProjectPath {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }
        if let Some(c) = segment
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(ManifestError::InvalidProjectPath {
                path: path.to_string(),
                reason: format!("invalid character '{c}' in segment '{segment}'"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_with_root() {
        let registry = ProjectRegistry::new();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.project(registry.root()).display_path(), ":");
    }

    #[test]
    fn test_register_materializes_parents() {
        let mut registry = ProjectRegistry::new();

        let id = registry.register("libs:printer").unwrap();

        assert_eq!(registry.project(id).path(), "libs:printer");
        let libs = registry.get("libs").expect("intermediate parent exists");
        assert_eq!(registry.project(id).parent(), Some(libs));
        assert_eq!(registry.project(libs).parent(), Some(registry.root()));
        assert_eq!(registry.project(libs).children(), &[id]);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ProjectRegistry::new();

        let first = registry.register("app").unwrap();
        let second = registry.register("app").unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let mut registry = ProjectRegistry::new();

        assert!(registry.register("").is_err());
        assert!(registry.register("app:").is_err());
        assert!(registry.register(":app").is_err());
        assert!(registry.register("app:with space").is_err());
    }

    #[test]
    fn test_ensure_property_guards_existing_value() {
        let mut registry = ProjectRegistry::new();
        let id = registry.register("printer").unwrap();
        let project = registry.project_mut(id);
        project.set_property("namespace", Value::String("com.example.y".into()));

        let written = project.ensure_property("namespace", Value::String("com.example.x".into()));

        assert!(!written);
        assert_eq!(
            project.property("namespace").and_then(Value::as_str),
            Some("com.example.y")
        );
    }

    #[test]
    fn test_ensure_property_sets_when_unset() {
        let mut registry = ProjectRegistry::new();
        let id = registry.register("printer").unwrap();
        let project = registry.project_mut(id);

        let written = project.ensure_property("namespace", Value::String("com.example.x".into()));

        assert!(written);
    }

    #[test]
    fn test_namespaced_capability() {
        let mut registry = ProjectRegistry::new();
        let id = registry.register("printer").unwrap();
        let project = registry.project_mut(id);

        assert_eq!(project.namespace(), None);
        project.set_namespace("com.example.printer");
        assert_eq!(project.namespace(), Some("com.example.printer"));
    }

    #[test]
    fn test_name_is_last_segment() {
        let mut registry = ProjectRegistry::new();
        let id = registry.register("libs:printer").unwrap();

        assert_eq!(registry.project(id).name(), "printer");
    }
}
