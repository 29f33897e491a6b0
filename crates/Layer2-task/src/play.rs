//! Play and play context

use crate::vars::Vars;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named play: the scope tasks and play-level variables belong to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Play {
    /// Play name
    #[serde(default)]
    pub name: String,

    /// Play-level variables (lowest precedence)
    #[serde(default)]
    pub vars: Vars,
}

impl Play {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vars::new(),
        }
    }
}

/// Execution parameters for every task in a play.
///
/// Read-only for workers; forwarded to the executor untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayContext {
    /// Connection plugin name
    #[serde(default = "default_connection")]
    pub connection: String,

    /// Privilege escalation
    #[serde(default, rename = "become")]
    pub become_: bool,

    /// User to become
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub become_user: Option<String>,

    /// Per-task timeout in seconds (0 = none)
    #[serde(default)]
    pub timeout: u64,

    /// Report what would change without changing it
    #[serde(default)]
    pub check_mode: bool,
}

impl Default for PlayContext {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            become_: false,
            become_user: None,
            timeout: 0,
            check_mode: false,
        }
    }
}

impl PlayContext {
    /// Timeout as a duration, if one is set
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

fn default_connection() -> String {
    "local".to_string()
}
