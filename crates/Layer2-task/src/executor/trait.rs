//! Executor trait

use crate::error::TaskResult;
use crate::executor::PluginRegistry;
use crate::host::Host;
use crate::loader::ResourceLoader;
use crate::play::PlayContext;
use crate::result::Payload;
use crate::stdin::InputStream;
use crate::task::Task;
use crate::vars::Vars;

/// Everything a worker hands to the executor for one task
pub struct ExecutionRequest<'a> {
    pub host: &'a Host,
    pub task: &'a Task,
    pub task_vars: &'a Vars,
    pub play_context: &'a PlayContext,
    pub stdin: &'a mut InputStream,
    pub loader: &'a dyn ResourceLoader,
    pub plugins: &'a PluginRegistry,
}

/// Executor trait - implement to change how a task is carried out on a host.
///
/// `execute` is synchronous and runs on the worker's own thread; it may block.
pub trait TaskExecutor: Send + Sync {
    /// Run the task and return its raw payload
    fn execute(&self, request: ExecutionRequest<'_>) -> TaskResult<Payload>;

    /// Get executor name
    fn name(&self) -> &'static str;
}
