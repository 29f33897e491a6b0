//! Worker - runs one task against one host and posts exactly one result
//!
//! Lifecycle:
//! 1. The coordinator builds a `Worker` with fully-resolved inputs.
//! 2. [`Worker::start`] releases the admission permit and moves the worker
//!    onto its own blocking thread.
//! 3. [`Worker::run`] acquires a private stdin, calls the executor, classifies
//!    the outcome and posts at most one [`OutcomeEnvelope`].
//!
//! Nothing raised by the executor, and nothing raised while posting, escapes
//! `run`. The worker is consumed by `start`/`run` and cannot be reused.

use crate::admission::AdmissionPermit;
use crate::channel::{PostMode, ResultSender};
use crate::classify::{classify, diagnostic, OutcomeKind};
use crate::error::{TaskError, TaskResult};
use crate::executor::{ActionExecutor, ExecutionRequest, PluginRegistry, TaskExecutor};
use crate::host::Host;
use crate::loader::{FsLoader, ResourceLoader};
use crate::observer::{TracingObserver, WorkerObserver};
use crate::play::{Play, PlayContext};
use crate::result::{OutcomeEnvelope, Payload};
use crate::stdin::InputStream;
use crate::task::{Task, TaskId};
use crate::vars::{Vars, VariableManager};
use fleet_foundation::{Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;

/// Capability providers shared by every worker of a run.
///
/// Cloning is cheap; everything is behind an `Arc`.
#[derive(Clone)]
pub struct WorkerServices {
    pub executor: Arc<dyn TaskExecutor>,
    pub loader: Arc<dyn ResourceLoader>,
    pub variable_manager: Arc<VariableManager>,
    pub plugins: Arc<PluginRegistry>,
    pub observer: Arc<dyn WorkerObserver>,
}

impl WorkerServices {
    pub fn new(executor: Arc<dyn TaskExecutor>, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            executor,
            loader,
            variable_manager: Arc::new(VariableManager::new()),
            plugins: Arc::new(PluginRegistry::with_builtins()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_variable_manager(mut self, variable_manager: VariableManager) -> Self {
        self.variable_manager = Arc::new(variable_manager);
        self
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = Arc::new(plugins);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn WorkerObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl Default for WorkerServices {
    /// Action executor with built-in plugins, loading resources from `.`
    fn default() -> Self {
        Self::new(
            Arc::new(ActionExecutor::new()),
            Arc::new(FsLoader::new(PathBuf::from("."))),
        )
    }
}

impl std::fmt::Debug for WorkerServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerServices")
            .field("executor", &self.executor.name())
            .field("loader", &self.loader.base_dir())
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// How the worker obtains its input stream
enum StdinSource {
    /// Duplicate process stdin, falling back to the shared stream
    Duplicate,
    /// Use the shared stream directly
    Ambient,
    /// Caller-supplied stream
    Provided(InputStream),
}

/// What a finished worker leaves behind
#[derive(Debug)]
pub struct WorkerExit {
    /// The worker's copy of the host, state already cleared
    pub host: Host,
    /// Whether an envelope reached the result channel
    pub delivered: bool,
}

/// One task on one host
pub struct Worker {
    results: ResultSender,
    play: Arc<Play>,
    host: Host,
    task: Arc<Task>,
    task_vars: Vars,
    play_context: Arc<PlayContext>,
    services: WorkerServices,
    stdin: StdinSource,
    slot: Option<OwnedSemaphorePermit>,
}

impl Worker {
    pub fn new(
        results: ResultSender,
        play: Arc<Play>,
        host: Host,
        task: Arc<Task>,
        task_vars: Vars,
        play_context: Arc<PlayContext>,
        services: WorkerServices,
    ) -> Self {
        Self {
            results,
            play,
            host,
            task,
            task_vars,
            play_context,
            services,
            stdin: StdinSource::Duplicate,
            slot: None,
        }
    }

    /// Skip stdin duplication and read from the shared stream
    pub fn with_ambient_stdin(mut self) -> Self {
        self.stdin = StdinSource::Ambient;
        self
    }

    /// Read from the given stream instead of stdin
    pub fn with_stdin(mut self, stdin: InputStream) -> Self {
        self.stdin = StdinSource::Provided(stdin);
        self
    }

    /// Hold a concurrency slot until the worker exits
    pub fn with_slot(mut self, slot: OwnedSemaphorePermit) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn play(&self) -> &Play {
        &self.play
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn variable_manager(&self) -> &VariableManager {
        &self.services.variable_manager
    }

    /// Release the admission permit and run on a dedicated blocking thread.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, permit: &AdmissionPermit) -> WorkerHandle {
        permit.release();

        let host = self.host.name.clone();
        let task_id = self.task.id;
        let join = tokio::task::spawn_blocking(move || self.run());

        WorkerHandle {
            host,
            task_id,
            join,
        }
    }

    /// Run to completion on the current thread.
    ///
    /// Blocks; do not call from inside an async task.
    pub fn run(mut self) -> WorkerExit {
        let observer = Arc::clone(&self.services.observer);
        observer.on_start(&self.host.name, &self.task);

        let mut stdin = match std::mem::replace(&mut self.stdin, StdinSource::Ambient) {
            StdinSource::Duplicate => InputStream::acquire(),
            StdinSource::Ambient => InputStream::ambient(),
            StdinSource::Provided(stream) => stream,
        };

        let outcome = self.execute(&mut stdin);
        drop(stdin);
        observer.on_executed(&self.host.name, &self.task);

        let delivered = match outcome {
            Ok(payload) => self.report_success(payload),
            Err(err) => self.report_error(err),
        };

        observer.on_exit(&self.host.name, &self.task);

        // returns the fork slot to the coordinator
        drop(self.slot.take());

        WorkerExit {
            host: self.host,
            delivered,
        }
    }

    /// Call the executor, turning a panic into `TaskError::Panic`
    fn execute(&self, stdin: &mut InputStream) -> TaskResult<Payload> {
        let request = ExecutionRequest {
            host: &self.host,
            task: &self.task,
            task_vars: &self.task_vars,
            play_context: &self.play_context,
            stdin,
            loader: self.services.loader.as_ref(),
            plugins: &self.services.plugins,
        };

        let executor = &self.services.executor;
        panic::catch_unwind(AssertUnwindSafe(move || executor.execute(request)))
            .unwrap_or_else(|payload| Err(TaskError::Panic(panic_message(payload.as_ref()))))
    }

    fn report_success(&mut self, payload: Payload) -> bool {
        self.host.clear_state();

        let envelope = OutcomeEnvelope::new(&self.host.name, self.task.id.to_string(), payload);
        self.services.observer.on_sending(&envelope);

        match self.results.put(envelope, PostMode::Blocking) {
            Ok(()) => {
                self.services.observer.on_sent(&self.host.name, &self.task);
                true
            }
            Err(e) => self.report_error(TaskError::Channel(e)),
        }
    }

    fn report_error(&mut self, err: TaskError) -> bool {
        let kind = classify(&err);
        self.services
            .observer
            .on_classified(&self.host.name, &self.task, kind, &err);

        self.host.clear_state();

        let envelope = match kind {
            OutcomeKind::Silent => return false,
            OutcomeKind::Unreachable => {
                OutcomeEnvelope::unreachable(&self.host.name, self.task.id.to_string())
            }
            OutcomeKind::Failure => OutcomeEnvelope::failed(
                &self.host.name,
                self.task.id.to_string(),
                diagnostic(&err),
            ),
        };

        self.services.observer.on_sending(&envelope);
        match self.results.put(envelope, PostMode::NonBlocking) {
            Ok(()) => {
                self.services.observer.on_sent(&self.host.name, &self.task);
                true
            }
            Err(e) => {
                self.services.observer.on_post_failed(
                    &self.host.name,
                    &self.task,
                    &e,
                    &diagnostic(&err),
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("host", &self.host.name)
            .field("task", &self.task.id)
            .field("action", &self.task.action)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a started worker
#[derive(Debug)]
pub struct WorkerHandle {
    host: String,
    task_id: TaskId,
    join: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker thread to exit
    pub async fn join(self) -> Result<WorkerExit> {
        self.join.await.map_err(|e| {
            Error::Worker(format!(
                "worker for {} / {} crashed: {}",
                self.host,
                self.task_id.short(),
                e
            ))
        })
    }
}
