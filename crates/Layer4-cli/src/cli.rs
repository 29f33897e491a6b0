//! `fleet run` - execute a playbook and print the recap

use crate::playbook::{parse_extra_var, Playbook};
use fleet_foundation::FleetConfig;
use fleet_task::{
    ActionExecutor, Coordinator, CoordinatorConfig, FsLoader, OutcomeEnvelope, PlayRecap,
    VariableManager, Vars, WorkerServices,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for a single `fleet run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub playbook: PathBuf,
    pub extra_vars: Vec<String>,
    pub check: bool,
}

/// Run a playbook. Returns `true` when every host succeeded.
pub async fn run_playbook(config: &FleetConfig, opts: &RunOptions) -> anyhow::Result<bool> {
    let playbook = Playbook::load(&opts.playbook)?;

    let mut extra_vars = Vars::new();
    for raw in &opts.extra_vars {
        let (key, value) = parse_extra_var(raw)?;
        extra_vars.insert(key, value);
    }

    let resource_dir = resource_dir(config, &opts.playbook);
    tracing::debug!(dir = %resource_dir.display(), "resolving resources");

    let services = WorkerServices::new(
        Arc::new(ActionExecutor::new()),
        Arc::new(FsLoader::new(resource_dir)),
    )
    .with_variable_manager(VariableManager::new().with_extra_vars(extra_vars));

    let coordinator = Coordinator::new(CoordinatorConfig::from(config), services);

    let mut context = playbook.context.clone();
    context.check_mode |= opts.check;

    let play = playbook.play();
    let tasks = playbook.tasks();

    println!("\nPLAY [{}] {}", play.name, "*".repeat(60));

    let recap = tokio::select! {
        recap = coordinator.run_play(&play, &context, &playbook.hosts, &tasks) => recap?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n[ERROR]: User interrupted execution");
            return Ok(false);
        }
    };

    print_results(&recap);
    print_recap(&recap);

    Ok(recap.is_success())
}

/// Config `resourceDir`, otherwise the playbook's directory
fn resource_dir(config: &FleetConfig, playbook: &Path) -> PathBuf {
    match &config.resource_dir {
        Some(dir) => PathBuf::from(dir),
        None => playbook
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

fn print_results(recap: &PlayRecap) {
    for envelope in &recap.envelopes {
        println!("{}", result_line(envelope));
    }
}

fn result_line(envelope: &OutcomeEnvelope) -> String {
    let host = &envelope.target_name;
    if envelope.is_unreachable() {
        format!("fatal: [{}]: UNREACHABLE!", host)
    } else if envelope.is_failed() {
        let detail = envelope
            .exception()
            .map(str::to_string)
            .or_else(|| envelope.result.get("msg").map(|m| m.to_string()))
            .unwrap_or_default();
        format!("fatal: [{}]: FAILED! => {}", host, truncate(&detail, 200))
    } else if envelope.is_changed() {
        format!("changed: [{}]", host)
    } else {
        format!("ok: [{}]", host)
    }
}

fn print_recap(recap: &PlayRecap) {
    println!("\nPLAY RECAP {}", "*".repeat(60));
    for (host, stats) in &recap.stats {
        println!(
            "{:<24} : ok={:<4} changed={:<4} unreachable={:<4} failed={:<4} silent={:<4}",
            host, stats.ok, stats.changed, stats.unreachable, stats.failed, stats.silent
        );
    }
    println!();
}

/// Truncate a string for display
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
