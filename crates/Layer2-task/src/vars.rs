//! Variable resolution

use crate::host::Host;
use crate::play::Play;
use crate::task::Task;
use serde_json::{Map, Value};

/// Variable mapping used for host vars, task vars and action args
pub type Vars = Map<String, Value>;

/// Builds the variable set a task sees on one host.
///
/// Precedence, lowest first: play vars, host vars, magic vars, extra vars.
#[derive(Debug, Clone, Default)]
pub struct VariableManager {
    extra_vars: Vars,
}

impl VariableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables passed on the command line; highest precedence
    pub fn with_extra_vars(mut self, extra_vars: Vars) -> Self {
        self.extra_vars = extra_vars;
        self
    }

    pub fn extra_vars(&self) -> &Vars {
        &self.extra_vars
    }

    /// Resolve the variables for `task` on `host`
    pub fn task_vars(&self, play: &Play, host: &Host, task: &Task) -> Vars {
        let mut vars = play.vars.clone();

        for (k, v) in &host.vars {
            vars.insert(k.clone(), v.clone());
        }

        vars.insert(
            "inventory_hostname".to_string(),
            Value::String(host.name.clone()),
        );
        vars.insert(
            "group_names".to_string(),
            Value::Array(host.groups.iter().cloned().map(Value::String).collect()),
        );
        vars.insert("play_name".to_string(), Value::String(play.name.clone()));
        vars.insert("task_name".to_string(), Value::String(task.name.clone()));

        for (k, v) in &self.extra_vars {
            vars.insert(k.clone(), v.clone());
        }

        vars
    }
}
