//! Structured build events
//!
//! The orchestrator reports lifecycle milestones as typed events delivered
//! to an [`EventSink`]. Sinks are fire-and-forget: the core never reads
//! anything back from a sink, and delivery is synchronous on the single
//! executing thread.

use serde::Serialize;

/// Lifecycle events emitted during evaluation and execution
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    /// A project finished its configuration phase
    ProjectEvaluated { project: String },

    /// A registered configuration action mutated a project
    ActionApplied { project: String, action: String },

    /// A task action is about to run
    TaskStarted { task: String },

    /// A task action completed successfully
    TaskSucceeded { task: String },

    /// A task action failed
    TaskFailed { task: String, error: String },
}

/// Destination for build events
pub trait EventSink {
    /// Deliver a single event
    fn emit(&self, event: &BuildEvent);
}

/// Forwards events to the tracing subscriber
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &BuildEvent) {
        match event {
            BuildEvent::ProjectEvaluated { project } => {
                tracing::info!(project = %project, "project evaluated");
            }
            BuildEvent::ActionApplied { project, action } => {
                tracing::info!(project = %project, action = %action, "action applied");
            }
            BuildEvent::TaskStarted { task } => {
                tracing::info!(task = %task, "task started");
            }
            BuildEvent::TaskSucceeded { task } => {
                tracing::info!(task = %task, "task succeeded");
            }
            BuildEvent::TaskFailed { task, error } => {
                tracing::error!(task = %task, error = %error, "task failed");
            }
        }
    }
}

/// Prints one JSON object per event to stdout, for scripting
#[derive(Debug, Default)]
pub struct JsonSink;

impl EventSink for JsonSink {
    fn emit(&self, event: &BuildEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("failed to serialize event: {e}"),
        }
    }
}

/// Records events in memory for later inspection
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: std::sync::Mutex<Vec<BuildEvent>>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
