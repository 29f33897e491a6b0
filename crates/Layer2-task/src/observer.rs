//! Worker observer - diagnostics sink injected into every worker

use crate::channel::ChannelError;
use crate::classify::OutcomeKind;
use crate::error::TaskError;
use crate::result::OutcomeEnvelope;
use crate::task::Task;
use tracing::{debug, info, warn};

/// Receives lifecycle events from workers.
///
/// Called from worker threads, so implementations must be cheap and must not
/// panic.
pub trait WorkerObserver: Send + Sync {
    /// Worker thread began running
    fn on_start(&self, _host: &str, _task: &Task) {}

    /// Executor returned (either way)
    fn on_executed(&self, _host: &str, _task: &Task) {}

    /// Executor error was classified
    fn on_classified(&self, _host: &str, _task: &Task, _kind: OutcomeKind, _error: &TaskError) {}

    /// Envelope is about to be posted
    fn on_sending(&self, _envelope: &OutcomeEnvelope) {}

    /// Envelope landed in the result channel
    fn on_sent(&self, _host: &str, _task: &Task) {}

    /// Envelope could not be posted; this is the only record of the outcome
    fn on_post_failed(&self, _host: &str, _task: &Task, _error: &ChannelError, _diagnostic: &str) {}

    /// Worker is about to exit
    fn on_exit(&self, _host: &str, _task: &Task) {}
}

/// Default observer that writes everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WorkerObserver for TracingObserver {
    fn on_start(&self, host: &str, task: &Task) {
        debug!(host, task = %task.id.short(), action = %task.action, "worker starting run");
    }

    fn on_executed(&self, host: &str, task: &Task) {
        debug!(host, task = %task.id.short(), "done running executor");
    }

    fn on_classified(&self, host: &str, task: &Task, kind: OutcomeKind, error: &TaskError) {
        match kind {
            OutcomeKind::Silent => {
                debug!(host, task = %task.id.short(), %error, "worker terminating without result")
            }
            _ => info!(host, task = %task.id.short(), %kind, %error, "task raised"),
        }
    }

    fn on_sending(&self, envelope: &OutcomeEnvelope) {
        debug!(
            host = %envelope.target_name,
            task = %envelope.task_uuid,
            failed = envelope.is_failed(),
            unreachable = envelope.is_unreachable(),
            "sending task result"
        );
    }

    fn on_sent(&self, host: &str, task: &Task) {
        debug!(host, task = %task.id.short(), "done sending task result");
    }

    fn on_post_failed(&self, host: &str, task: &Task, error: &ChannelError, diagnostic: &str) {
        warn!(host, task = %task.id.short(), %error, "could not send task result");
        debug!(host, task = %task.id.short(), "worker diagnostic:\n{}", diagnostic);
    }

    fn on_exit(&self, host: &str, task: &Task) {
        debug!(host, task = %task.id.short(), "worker exiting");
    }
}
