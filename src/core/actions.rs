//! Configuration action registry
//!
//! Rules pair a project matcher with an idempotent configuration action.
//! They run while a project is being evaluated, in registration order. A
//! rule whose matcher cannot be evaluated is reported and treated as a
//! non-match; it never fails the build.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::project::{Namespaced, Project};
use crate::error::ActionError;
use crate::event::{BuildEvent, EventSink};

/// A configuration rule from the manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRule {
    /// Exact project path to match
    #[serde(default)]
    pub project: Option<String>,

    /// Regex over project paths to match
    #[serde(default)]
    pub pattern: Option<String>,

    /// The action to apply
    #[serde(flatten)]
    pub action: ConfigAction,
}

/// Idempotent mutations of a project's property bag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigAction {
    /// Overwrite a property
    Set {
        key: String,
        value: toml::Value,
    },

    /// Set a property only when it is currently unset
    Ensure {
        key: String,
        value: toml::Value,
    },

    /// Set the namespace only when none is present, through the
    /// [`Namespaced`] capability
    EnsureNamespace {
        value: String,
    },
}

impl ActionRule {
    /// Whether this rule applies to the given project path
    ///
    /// A rule with no matcher applies to every project. Matcher failures
    /// surface as [`ActionError::Predicate`]; callers treat that as a
    /// non-match.
    pub fn matches(&self, project_path: &str) -> Result<bool, ActionError> {
        if let Some(exact) = &self.project {
            return Ok(exact == project_path);
        }
        if let Some(pattern) = &self.pattern {
            let re = Regex::new(pattern).map_err(|e| ActionError::Predicate {
                pattern: pattern.clone(),
                error: e.to_string(),
            })?;
            return Ok(re.is_match(project_path));
        }
        Ok(true)
    }
}

impl ConfigAction {
    /// Apply the action; returns `true` when the property bag changed
    pub fn apply(&self, project: &mut Project) -> bool {
        match self {
            Self::Set { key, value } => {
                project.set_property(key, value.clone());
                true
            }
            Self::Ensure { key, value } => project.ensure_property(key, value.clone()),
            Self::EnsureNamespace { value } => {
                if project.namespace().is_some() {
                    return false;
                }
                project.set_namespace(value);
                true
            }
        }
    }

    /// Short label for events and reports
    pub fn describe(&self) -> String {
        match self {
            Self::Set { key, .. } => format!("set {key}"),
            Self::Ensure { key, .. } => format!("ensure {key}"),
            Self::EnsureNamespace { .. } => "ensure namespace".to_string(),
        }
    }
}

/// Ordered collection of action rules
#[derive(Debug, Default)]
pub struct ActionRegistry {
    rules: Vec<ActionRule>,
}

impl ActionRegistry {
    /// Build a registry from manifest rules
    pub fn from_rules(rules: Vec<ActionRule>) -> Self {
        Self { rules }
    }

    /// Append a rule
    pub fn register(&mut self, rule: ActionRule) {
        self.rules.push(rule);
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every matching rule to a project, in registration order
    ///
    /// Emits an [`BuildEvent::ActionApplied`] per rule that actually
    /// changed the property bag.
    pub fn apply_to(&self, project: &mut Project, sink: &dyn EventSink) {
        for rule in &self.rules {
            let matched = match rule.matches(project.path()) {
                Ok(matched) => matched,
                Err(err) => {
                    tracing::warn!("{err}");
                    false
                }
            };
            if !matched {
                continue;
            }
            if rule.action.apply(project) {
                sink.emit(&BuildEvent::ActionApplied {
                    project: project.display_path().to_string(),
                    action: rule.action.describe(),
                });
            }
        }
    }
}
