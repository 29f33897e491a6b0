//! Outcome envelopes posted by workers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw result payload produced by an executor
pub type Payload = Map<String, Value>;

/// Payload keys the coordinator recognizes. Anything else is task data.
pub mod keys {
    pub const UNREACHABLE: &str = "unreachable";
    pub const FAILED: &str = "failed";
    pub const EXCEPTION: &str = "exception";
    pub const STDOUT: &str = "stdout";
    pub const CHANGED: &str = "changed";
    pub const MSG: &str = "msg";
}

/// The single message a worker posts for its task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEnvelope {
    /// Host the task ran against
    pub target_name: String,

    /// Task identifier
    pub task_uuid: String,

    /// Result payload
    pub result: Payload,

    /// When the worker built this envelope
    pub finished_at: DateTime<Utc>,
}

impl OutcomeEnvelope {
    pub fn new(target_name: impl Into<String>, task_uuid: impl Into<String>, result: Payload) -> Self {
        Self {
            target_name: target_name.into(),
            task_uuid: task_uuid.into(),
            result,
            finished_at: Utc::now(),
        }
    }

    /// `{unreachable: true}`
    pub fn unreachable(target_name: impl Into<String>, task_uuid: impl Into<String>) -> Self {
        let mut result = Payload::new();
        result.insert(keys::UNREACHABLE.to_string(), Value::Bool(true));
        Self::new(target_name, task_uuid, result)
    }

    /// `{failed: true, exception: <text>, stdout: ""}`
    pub fn failed(
        target_name: impl Into<String>,
        task_uuid: impl Into<String>,
        exception: impl Into<String>,
    ) -> Self {
        let mut result = Payload::new();
        result.insert(keys::FAILED.to_string(), Value::Bool(true));
        result.insert(keys::EXCEPTION.to_string(), Value::String(exception.into()));
        result.insert(keys::STDOUT.to_string(), Value::String(String::new()));
        Self::new(target_name, task_uuid, result)
    }

    fn flag(&self, key: &str) -> bool {
        self.result.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_unreachable(&self) -> bool {
        self.flag(keys::UNREACHABLE)
    }

    pub fn is_failed(&self) -> bool {
        self.flag(keys::FAILED)
    }

    pub fn is_changed(&self) -> bool {
        self.flag(keys::CHANGED)
    }

    pub fn exception(&self) -> Option<&str> {
        self.result.get(keys::EXCEPTION).and_then(Value::as_str)
    }
}
