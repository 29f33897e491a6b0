//! Target host (the resource a task runs against)

use crate::vars::Vars;
use serde::{Deserialize, Serialize};

/// A managed node.
///
/// `vars` and `groups` are populated from inventory before a worker runs and
/// emptied by the worker afterwards. Each worker owns its own clone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Unique name
    pub name: String,

    /// Resolved host variables
    #[serde(default)]
    pub vars: Vars,

    /// Group memberships
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vars::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.vars.insert(key.into(), value);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Drop variable and group state so the worker does not retain it.
    pub fn clear_state(&mut self) {
        self.vars = Vars::new();
        self.groups = Vec::new();
    }

    /// True once `clear_state` has run (or nothing was ever populated)
    pub fn is_cleared(&self) -> bool {
        self.vars.is_empty() && self.groups.is_empty()
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
