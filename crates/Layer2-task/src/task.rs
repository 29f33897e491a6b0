//! Task definition and types

use crate::vars::Vars;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in log lines
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work to run against one host.
///
/// Immutable once handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    #[serde(default)]
    pub id: TaskId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Action (plugin name) to dispatch to
    pub action: String,

    /// Action arguments
    #[serde(default)]
    pub args: Vars,
}

impl Task {
    /// Create a new task
    pub fn new(action: impl Into<String>, args: Vars) -> Self {
        let action = action.into();
        Self {
            id: TaskId::new(),
            name: action.clone(),
            action,
            args,
        }
    }

    /// Set display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TASK: {} ({})", self.name, self.id.short())
    }
}
