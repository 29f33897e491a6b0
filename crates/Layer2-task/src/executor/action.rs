//! Action executor - the default `TaskExecutor`
//!
//! Looks the task's action up in the plugin registry, renders `{{ var }}`
//! references in its arguments against the task vars, and runs the plugin.

use crate::error::{TaskError, TaskResult};
use crate::executor::{ActionContext, ExecutionRequest, TaskExecutor};
use crate::result::Payload;
use crate::vars::Vars;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Connection plugins this executor can drive
const SUPPORTED_CONNECTIONS: &[&str] = &["local"];

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid variable pattern")
    })
}

/// Substitute `{{ name }}` references in `template` with values from `vars`.
///
/// Strings are inserted verbatim; other values as compact JSON. An undefined
/// name is an error.
pub fn render(template: &str, vars: &Vars) -> TaskResult<String> {
    let mut missing = None;

    let rendered = var_pattern().replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(TaskError::Action(format!("'{}' is undefined", name))),
        None => Ok(rendered.into_owned()),
    }
}

/// Render every string inside `value`, recursing into arrays and objects
fn render_value(value: &Value, vars: &Vars) -> TaskResult<Value> {
    Ok(match value {
        Value::String(s) => Value::String(render(s, vars)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, vars))
                .collect::<TaskResult<_>>()?,
        ),
        Value::Object(map) => Value::Object(render_args(map, vars)?),
        other => other.clone(),
    })
}

fn render_args(args: &Vars, vars: &Vars) -> TaskResult<Vars> {
    args.iter()
        .map(|(k, v)| Ok((k.clone(), render_value(v, vars)?)))
        .collect()
}

/// Dispatches tasks to action plugins
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl TaskExecutor for ActionExecutor {
    fn execute(&self, request: ExecutionRequest<'_>) -> TaskResult<Payload> {
        let ExecutionRequest {
            host,
            task,
            task_vars,
            play_context,
            stdin,
            loader,
            plugins,
        } = request;

        if !SUPPORTED_CONNECTIONS.contains(&play_context.connection.as_str()) {
            return Err(TaskError::Unreachable(format!(
                "connection plugin '{}' is not available for {}",
                play_context.connection, host.name
            )));
        }

        let plugin = plugins
            .get(&task.action)
            .ok_or_else(|| TaskError::UnknownAction(task.action.clone()))?;

        let args = render_args(&task.args, task_vars)?;
        debug!(host = %host.name, action = %task.action, "dispatching action");

        let mut ctx = ActionContext {
            host,
            task,
            args: &args,
            vars: task_vars,
            play_context,
            stdin,
            loader,
        };
        plugin.run(&mut ctx)
    }

    fn name(&self) -> &'static str {
        "action"
    }
}
