//! Coordinator - fans tasks out to workers and collects their results
//!
//! Runs a play with the linear strategy: every task is started on every
//! live host, and the next task begins only after all workers for the
//! current one have exited. Hosts that fail or turn out unreachable are
//! dropped from the remaining tasks.

use crate::admission::AdmissionGate;
use crate::channel::result_channel;
use crate::host::Host;
use crate::play::{Play, PlayContext};
use crate::result::OutcomeEnvelope;
use crate::task::Task;
use crate::worker::{Worker, WorkerExit, WorkerServices};
use fleet_foundation::{Error, FleetConfig, Result};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum concurrently running workers
    pub forks: usize,
    /// Result channel capacity per task
    pub result_queue_capacity: usize,
    /// Give every worker its own duplicate of stdin
    pub duplicate_stdin: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&FleetConfig::default())
    }
}

impl From<&FleetConfig> for CoordinatorConfig {
    fn from(config: &FleetConfig) -> Self {
        Self {
            forks: config.forks.max(1),
            result_queue_capacity: config.result_queue_capacity.max(1),
            duplicate_stdin: config.duplicate_stdin,
        }
    }
}

/// Per-host counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub ok: usize,
    pub changed: usize,
    pub failed: usize,
    pub unreachable: usize,
    /// Workers that exited without reporting
    pub silent: usize,
}

impl HostStats {
    fn record(&mut self, envelope: &OutcomeEnvelope) {
        if envelope.is_unreachable() {
            self.unreachable += 1;
        } else if envelope.is_failed() {
            self.failed += 1;
        } else {
            self.ok += 1;
            if envelope.is_changed() {
                self.changed += 1;
            }
        }
    }
}

/// Results of one task across all hosts
#[derive(Debug, Default)]
pub struct TaskRun {
    /// Envelopes in arrival order
    pub envelopes: Vec<OutcomeEnvelope>,
    /// One exit per started worker
    pub exits: Vec<WorkerExit>,
}

/// Results of a whole play
#[derive(Debug, Default, Serialize)]
pub struct PlayRecap {
    /// Every envelope, in arrival order
    pub envelopes: Vec<OutcomeEnvelope>,
    /// Counters keyed by host name
    pub stats: BTreeMap<String, HostStats>,
}

impl PlayRecap {
    /// True when no host failed or was unreachable
    pub fn is_success(&self) -> bool {
        self.stats
            .values()
            .all(|s| s.failed == 0 && s.unreachable == 0)
    }

    pub fn host(&self, name: &str) -> Option<&HostStats> {
        self.stats.get(name)
    }
}

/// Owns the result channel, the admission gate and the fork slots
pub struct Coordinator {
    config: CoordinatorConfig,
    services: WorkerServices,
    gate: AdmissionGate,
    forks: Arc<Semaphore>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, services: WorkerServices) -> Self {
        let forks = Arc::new(Semaphore::new(config.forks.max(1)));
        Self {
            config,
            services,
            gate: AdmissionGate::new(),
            forks,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn services(&self) -> &WorkerServices {
        &self.services
    }

    /// Run one task on every host and wait for all workers to exit.
    ///
    /// Results are consumed while workers are still being started so a full
    /// channel never stalls the fan-out.
    pub async fn run_task(
        &self,
        play: &Arc<Play>,
        play_context: &Arc<PlayContext>,
        hosts: &[Host],
        task: &Arc<Task>,
    ) -> Result<TaskRun> {
        let (tx, mut rx) = result_channel(self.config.result_queue_capacity);

        info!(task = %task.name, id = %task.id.short(), hosts = hosts.len(), "running task");

        let spawn = async move {
            let mut handles = Vec::with_capacity(hosts.len());

            for host in hosts {
                let slot = Arc::clone(&self.forks)
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Internal("fork pool closed".to_string()))?;
                let permit = self.gate.admit().await?;

                let task_vars = self.services.variable_manager.task_vars(play, host, task);
                let mut worker = Worker::new(
                    tx.clone(),
                    Arc::clone(play),
                    host.clone(),
                    Arc::clone(task),
                    task_vars,
                    Arc::clone(play_context),
                    self.services.clone(),
                )
                .with_slot(slot);
                if !self.config.duplicate_stdin {
                    worker = worker.with_ambient_stdin();
                }

                handles.push(worker.start(&permit));
            }

            // workers hold the only remaining senders
            drop(tx);

            let mut exits = Vec::with_capacity(handles.len());
            for joined in join_all(handles.into_iter().map(|h| h.join())).await {
                match joined {
                    Ok(exit) => exits.push(exit),
                    Err(e) => warn!(error = %e, "worker did not exit cleanly"),
                }
            }
            Ok::<_, Error>(exits)
        };

        let collect = async move {
            let mut envelopes = Vec::new();
            while let Some(envelope) = rx.recv().await {
                debug!(host = %envelope.target_name, "received task result");
                envelopes.push(envelope);
            }
            envelopes
        };

        let (exits, envelopes) = tokio::join!(spawn, collect);
        Ok(TaskRun {
            envelopes,
            exits: exits?,
        })
    }

    /// Run every task in order over the given hosts
    pub async fn run_play(
        &self,
        play: &Play,
        play_context: &PlayContext,
        hosts: &[Host],
        tasks: &[Task],
    ) -> Result<PlayRecap> {
        let play = Arc::new(play.clone());
        let play_context = Arc::new(play_context.clone());

        let mut recap = PlayRecap::default();
        for host in hosts {
            recap.stats.entry(host.name.clone()).or_default();
        }

        let mut live: Vec<Host> = hosts.to_vec();

        info!(play = %play.name, hosts = hosts.len(), tasks = tasks.len(), "starting play");

        for task in tasks {
            if live.is_empty() {
                info!(play = %play.name, "no hosts remaining");
                break;
            }

            let task = Arc::new(task.clone());
            let run = self.run_task(&play, &play_context, &live, &task).await?;

            let mut dropped = HashSet::new();
            for envelope in &run.envelopes {
                let stats = recap.stats.entry(envelope.target_name.clone()).or_default();
                stats.record(envelope);
                if envelope.is_failed() || envelope.is_unreachable() {
                    dropped.insert(envelope.target_name.clone());
                }
            }
            for exit in run.exits.iter().filter(|e| !e.delivered) {
                recap.stats.entry(exit.host.name.clone()).or_default().silent += 1;
            }

            recap.envelopes.extend(run.envelopes);

            if !dropped.is_empty() {
                debug!(hosts = ?dropped, "removing hosts from play");
                live.retain(|h| !dropped.contains(&h.name));
            }
        }

        Ok(recap)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("available_forks", &self.forks.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TaskError, TaskResult};
    use crate::executor::{ExecutionRequest, TaskExecutor};
    use crate::loader::FsLoader;
    use crate::result::Payload;
    use crate::vars::Vars;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails on hosts named `bad*`, is unreachable on `gone*`, otherwise ok
    struct ByName;

    impl TaskExecutor for ByName {
        fn execute(&self, request: ExecutionRequest<'_>) -> TaskResult<Payload> {
            let name = request.host.name.as_str();
            if name.starts_with("bad") {
                Err(TaskError::Action("nope".into()))
            } else if name.starts_with("gone") {
                Err(TaskError::Unreachable("timeout".into()))
            } else if name.starts_with("quiet") {
                Err(TaskError::UserInterrupt)
            } else {
                let mut payload = Payload::new();
                payload.insert("changed".into(), json!(true));
                Ok(payload)
            }
        }

        fn name(&self) -> &'static str {
            "by-name"
        }
    }

    struct Counting {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TaskExecutor for Counting {
        fn execute(&self, _request: ExecutionRequest<'_>) -> TaskResult<Payload> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Payload::new())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn coordinator(executor: Arc<dyn TaskExecutor>, forks: usize) -> Coordinator {
        let services = WorkerServices::new(executor, Arc::new(FsLoader::new(".")));
        let config = CoordinatorConfig {
            forks,
            result_queue_capacity: 2,
            duplicate_stdin: false,
        };
        Coordinator::new(config, services)
    }

    fn hosts(names: &[&str]) -> Vec<Host> {
        names.iter().map(|n| Host::new(*n)).collect()
    }

    #[test]
    fn test_config_from_fleet_config() {
        let fleet = FleetConfig::default().forks(8);
        let config = CoordinatorConfig::from(&fleet);
        assert_eq!(config.forks, 8);
        assert!(config.duplicate_stdin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_forks_bound_concurrency() {
        let executor = Arc::new(Counting {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let coord = coordinator(executor.clone(), 3);
        let names: Vec<String> = (0..12).map(|i| format!("h{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let run = coord
            .run_task(
                &Arc::new(Play::new("p")),
                &Arc::new(PlayContext::default()),
                &hosts(&names),
                &Arc::new(Task::new("ping", Vars::new())),
            )
            .await
            .unwrap();

        assert_eq!(run.envelopes.len(), 12);
        assert_eq!(run.exits.len(), 12);
        assert!(executor.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_play_drops_failed_hosts() {
        let coord = coordinator(Arc::new(ByName), 4);
        let tasks = vec![
            Task::new("ping", Vars::new()),
            Task::new("ping", Vars::new()),
        ];

        let recap = coord
            .run_play(
                &Play::new("site"),
                &PlayContext::default(),
                &hosts(&["web1", "bad1", "gone1", "quiet1"]),
                &tasks,
            )
            .await
            .unwrap();

        let web = recap.host("web1").unwrap();
        assert_eq!((web.ok, web.changed), (2, 2));

        let bad = recap.host("bad1").unwrap();
        assert_eq!(bad.failed, 1);
        assert_eq!(bad.ok, 0);

        assert_eq!(recap.host("gone1").unwrap().unreachable, 1);

        // silent hosts stay in the play
        assert_eq!(recap.host("quiet1").unwrap().silent, 2);

        assert_eq!(recap.envelopes.len(), 4);
        assert!(!recap.is_success());
    }
}
