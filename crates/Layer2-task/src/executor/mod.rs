//! Task executors
//!
//! - `TaskExecutor` - the synchronous seam a worker calls into
//! - `ActionExecutor` - default executor; dispatches to action plugins
//! - `PluginRegistry` - shared action name → plugin table
//! - `builtin` - ping, command, template, pause, fail, debug

pub mod action;
pub mod builtin;
pub mod registry;
pub mod r#trait;

pub use action::{render, ActionExecutor};
pub use registry::{ActionContext, ActionPlugin, PluginRegistry};
pub use r#trait::{ExecutionRequest, TaskExecutor};
