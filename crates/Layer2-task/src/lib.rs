//! # fleet-task
//!
//! Runs one task against one host in an isolated worker and reports the
//! outcome to a shared result channel.
//!
//! ## Features
//!
//! - Workers on dedicated blocking threads with a private stdin
//! - Outcome classification (unreachable / failure / silent)
//! - Bounded multi-producer result channel
//! - Action executor with built-in actions and `{{ var }}` rendering
//! - Coordinator with fork limits and a linear play strategy

pub mod admission;
pub mod channel;
pub mod classify;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod host;
pub mod loader;
pub mod observer;
pub mod play;
pub mod result;
pub mod stdin;
pub mod task;
pub mod vars;
pub mod worker;

// Worker
pub use admission::{AdmissionGate, AdmissionPermit};
pub use worker::{Worker, WorkerExit, WorkerHandle, WorkerServices};

// Results
pub use channel::{result_channel, ChannelError, PostMode, ResultReceiver, ResultSender};
pub use classify::{classify, diagnostic, OutcomeKind};
pub use error::{TaskError, TaskResult};
pub use result::{OutcomeEnvelope, Payload};

// Execution
pub use executor::{
    render, ActionContext, ActionExecutor, ActionPlugin, ExecutionRequest, PluginRegistry,
    TaskExecutor,
};
pub use loader::{FsLoader, ResourceLoader};
pub use observer::{TracingObserver, WorkerObserver};
pub use stdin::InputStream;

// Model
pub use host::Host;
pub use play::{Play, PlayContext};
pub use task::{Task, TaskId};
pub use vars::{VariableManager, Vars};

// Coordination
pub use coordinator::{Coordinator, CoordinatorConfig, HostStats, PlayRecap, TaskRun};
