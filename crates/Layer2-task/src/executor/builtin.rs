//! Built-in actions
//!
//! - `ping` - connectivity check, returns `{ping: <data>}`. `data: crash`
//!   panics, `unreachable: true` reports the host as unreachable.
//! - `command` - runs `sh -c <cmd>` on the local machine
//! - `template` - renders a resource through the loader, optionally writes it
//! - `pause` - reads one line from the worker's input stream
//! - `fail` - fails the task with a message
//! - `debug` - echoes a message or variable

use crate::error::{TaskError, TaskResult};
use crate::executor::action::render;
use crate::executor::{ActionContext, ActionPlugin};
use crate::result::{keys, Payload};
use serde_json::{json, Value};
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, warn};

pub(crate) fn all() -> Vec<Arc<dyn ActionPlugin>> {
    vec![
        Arc::new(Ping),
        Arc::new(CommandAction),
        Arc::new(Template),
        Arc::new(Pause),
        Arc::new(Fail),
        Arc::new(DebugAction),
    ]
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn required_str<'a>(ctx: &'a ActionContext<'_>, action: &str, key: &str) -> TaskResult<&'a str> {
    ctx.args
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TaskError::invalid_args(action, format!("missing required argument '{}'", key)))
}

// ============================================================================
// ping
// ============================================================================

pub struct Ping;

impl ActionPlugin for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        if ctx.args.get("unreachable").and_then(Value::as_bool) == Some(true) {
            return Err(TaskError::Unreachable(format!(
                "{} did not answer ping",
                ctx.host.name
            )));
        }

        let data = ctx.args.get("data").and_then(Value::as_str).unwrap_or("pong");
        if data == "crash" {
            panic!("boom");
        }
        Ok(payload(json!({ "ping": data, "changed": false })))
    }
}

// ============================================================================
// command
// ============================================================================

pub struct CommandAction;

impl CommandAction {
    /// Run `fut` to completion from the worker's blocking thread.
    ///
    /// Workers run inside the coordinator's runtime; a worker driven directly
    /// on a plain thread gets a throwaway current-thread runtime instead.
    fn block_on<F: Future>(fut: F) -> TaskResult<F::Output> {
        match Handle::try_current() {
            Ok(handle) => Ok(handle.block_on(fut)),
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| TaskError::Action(format!("could not start process runtime: {}", e)))?;
                Ok(runtime.block_on(fut))
            }
        }
    }
}

impl ActionPlugin for CommandAction {
    fn name(&self) -> &'static str {
        "command"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        let cmd = required_str(ctx, self.name(), "cmd")?.to_string();

        if ctx.play_context.check_mode {
            return Ok(payload(json!({
                "skipped": true,
                "changed": false,
                "msg": "skipped in check mode",
            })));
        }

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&cmd)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = ctx.args.get("chdir").and_then(Value::as_str) {
            command.current_dir(dir);
        }

        let timeout = ctx.play_context.timeout();
        let started = Instant::now();

        let output = Self::block_on(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, command.output())
                    .await
                    .map_err(|_| TaskError::Timeout(limit)),
                None => Ok(command.output().await),
            }
        })??
        .map_err(|e| {
            warn!(host = %ctx.host.name, error = %e, "failed to run command");
            TaskError::Action(format!("failed to run '{}': {}", cmd, e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let rc = output.status.code().unwrap_or(-1);

        debug!(host = %ctx.host.name, rc, "command finished");

        let mut result = payload(json!({
            "cmd": cmd,
            "rc": rc,
            "stdout": stdout.trim_end_matches('\n'),
            "stderr": stderr.trim_end_matches('\n'),
            "changed": true,
            "delta_ms": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }));
        if rc != 0 {
            result.insert(keys::FAILED.to_string(), Value::Bool(true));
            result.insert(keys::MSG.to_string(), json!("non-zero return code"));
        }
        Ok(result)
    }
}

// ============================================================================
// template
// ============================================================================

pub struct Template;

impl ActionPlugin for Template {
    fn name(&self) -> &'static str {
        "template"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        let src = required_str(ctx, self.name(), "src")?;
        let source = ctx.loader.read_resource(src)?;
        let content = render(&source, ctx.vars)?;

        let mut result = payload(json!({ "src": src, "changed": false }));

        match ctx.args.get("dest").and_then(Value::as_str) {
            Some(dest) => {
                let current = std::fs::read_to_string(dest).ok();
                let changed = current.as_deref() != Some(content.as_str());
                if changed && !ctx.play_context.check_mode {
                    std::fs::write(dest, &content).map_err(|e| {
                        TaskError::Action(format!("could not write {}: {}", dest, e))
                    })?;
                }
                result.insert("dest".to_string(), json!(dest));
                result.insert(keys::CHANGED.to_string(), json!(changed));
            }
            None => {
                result.insert("content".to_string(), json!(content));
            }
        }

        Ok(result)
    }
}

// ============================================================================
// pause
// ============================================================================

pub struct Pause;

impl ActionPlugin for Pause {
    fn name(&self) -> &'static str {
        "pause"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        let prompt = ctx
            .args
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or("Press enter to continue")
            .to_string();

        let mut line = String::new();
        if ctx.stdin.read_line(&mut line)? == 0 {
            return Err(TaskError::EndOfStream);
        }

        Ok(payload(json!({
            "prompt": prompt,
            "user_input": line.trim_end_matches(&['\r', '\n'][..]),
            "changed": false,
        })))
    }
}

// ============================================================================
// fail
// ============================================================================

pub struct Fail;

impl ActionPlugin for Fail {
    fn name(&self) -> &'static str {
        "fail"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        let msg = ctx
            .args
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("Failed as requested from task");
        Err(TaskError::Action(msg.to_string()))
    }
}

// ============================================================================
// debug
// ============================================================================

pub struct DebugAction;

impl ActionPlugin for DebugAction {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
        if let Some(var) = ctx.args.get("var").and_then(Value::as_str) {
            let value = ctx
                .vars
                .get(var)
                .cloned()
                .unwrap_or_else(|| json!(format!("VARIABLE IS NOT DEFINED: {}", var)));
            let mut result = payload(json!({ "changed": false }));
            result.insert(var.to_string(), value);
            return Ok(result);
        }

        let msg = ctx
            .args
            .get("msg")
            .cloned()
            .unwrap_or_else(|| json!("Hello world!"));
        Ok(payload(json!({ "msg": msg, "changed": false })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::loader::{FsLoader, ResourceLoader};
    use crate::play::PlayContext;
    use crate::stdin::InputStream;
    use crate::task::Task;
    use crate::vars::Vars;
    use std::io::Cursor;

    struct Fixture {
        host: Host,
        task: Task,
        vars: Vars,
        play_context: PlayContext,
        stdin: InputStream,
        loader: FsLoader,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(action: &str, args: Value) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut vars = Vars::new();
            vars.insert("name".into(), json!("web1"));
            Self {
                host: Host::new("web1"),
                task: Task::new(action, payload(args)),
                vars,
                play_context: PlayContext::default(),
                stdin: InputStream::from_reader(Cursor::new("")),
                loader: FsLoader::new(dir.path()),
                _dir: dir,
            }
        }

        fn run(&mut self, plugin: &dyn ActionPlugin) -> TaskResult<Payload> {
            let args = self.task.args.clone();
            let mut ctx = ActionContext {
                host: &self.host,
                task: &self.task,
                args: &args,
                vars: &self.vars,
                play_context: &self.play_context,
                stdin: &mut self.stdin,
                loader: &self.loader,
            };
            plugin.run(&mut ctx)
        }
    }

    #[test]
    fn test_ping() {
        let mut fx = Fixture::new("ping", json!({}));
        let out = fx.run(&Ping).unwrap();
        assert_eq!(out["ping"], json!("pong"));

        let mut fx = Fixture::new("ping", json!({ "unreachable": true }));
        assert!(matches!(fx.run(&Ping), Err(TaskError::Unreachable(_))));
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_ping_crash_panics() {
        let mut fx = Fixture::new("ping", json!({ "data": "crash" }));
        let _ = fx.run(&Ping);
    }

    /// Run `fx` against `command` on a blocking thread, like a worker does
    async fn run_command(mut fx: Fixture) -> TaskResult<Payload> {
        tokio::task::spawn_blocking(move || fx.run(&CommandAction))
            .await
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_success_and_failure() {
        let fx = Fixture::new("command", json!({ "cmd": "echo hello" }));
        let out = run_command(fx).await.unwrap();
        assert_eq!(out["rc"], json!(0));
        assert_eq!(out["stdout"], json!("hello"));
        assert!(out.get("failed").is_none());

        let fx = Fixture::new("command", json!({ "cmd": "echo oops >&2; exit 3" }));
        let out = run_command(fx).await.unwrap();
        assert_eq!(out["rc"], json!(3));
        assert_eq!(out["stderr"], json!("oops"));
        assert_eq!(out["failed"], json!(true));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_timeout() {
        let mut fx = Fixture::new("command", json!({ "cmd": "sleep 5" }));
        fx.play_context.timeout = 1;

        let started = std::time::Instant::now();
        assert!(matches!(run_command(fx).await, Err(TaskError::Timeout(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_command_bad_chdir_is_action_error() {
        let fx = Fixture::new(
            "command",
            json!({ "cmd": "echo hi", "chdir": "/definitely/not/here" }),
        );
        match run_command(fx).await {
            Err(TaskError::Action(msg)) => assert!(msg.contains("failed to run 'echo hi'")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_without_runtime() {
        let mut fx = Fixture::new("command", json!({ "cmd": "echo plain" }));
        let out = fx.run(&CommandAction).unwrap();
        assert_eq!(out["stdout"], json!("plain"));
    }

    #[test]
    fn test_command_requires_cmd() {
        let mut fx = Fixture::new("command", json!({}));
        assert!(matches!(
            fx.run(&CommandAction),
            Err(TaskError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn test_command_check_mode() {
        let mut fx = Fixture::new("command", json!({ "cmd": "rm -rf /tmp/nothing" }));
        fx.play_context.check_mode = true;
        let out = fx.run(&CommandAction).unwrap();
        assert_eq!(out["skipped"], json!(true));
    }

    #[test]
    fn test_template_renders_content() {
        let mut fx = Fixture::new("template", json!({ "src": "motd.j2" }));
        std::fs::write(fx.loader.base_dir().join("motd.j2"), "welcome to {{ name }}").unwrap();

        let out = fx.run(&Template).unwrap();
        assert_eq!(out["content"], json!("welcome to web1"));
    }

    #[test]
    fn test_template_writes_dest() {
        let mut fx = Fixture::new("template", json!({}));
        std::fs::write(fx.loader.base_dir().join("motd.j2"), "hi {{ name }}").unwrap();
        let dest = fx.loader.base_dir().join("motd");
        fx.task.args = payload(json!({ "src": "motd.j2", "dest": dest.to_str().unwrap() }));

        let out = fx.run(&Template).unwrap();
        assert_eq!(out["changed"], json!(true));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hi web1");

        let again = fx.run(&Template).unwrap();
        assert_eq!(again["changed"], json!(false));
    }

    #[test]
    fn test_template_missing_source() {
        let mut fx = Fixture::new("template", json!({ "src": "missing.j2" }));
        assert!(matches!(fx.run(&Template), Err(TaskError::ResourceNotFound(_))));
    }

    #[test]
    fn test_pause_reads_line() {
        let mut fx = Fixture::new("pause", json!({ "prompt": "continue?" }));
        fx.stdin = InputStream::from_reader(Cursor::new("yes\n"));

        let out = fx.run(&Pause).unwrap();
        assert_eq!(out["user_input"], json!("yes"));
        assert_eq!(out["prompt"], json!("continue?"));
    }

    #[test]
    fn test_pause_end_of_stream() {
        let mut fx = Fixture::new("pause", json!({}));
        assert!(matches!(fx.run(&Pause), Err(TaskError::EndOfStream)));
    }

    #[test]
    fn test_fail_and_debug() {
        let mut fx = Fixture::new("fail", json!({ "msg": "nope" }));
        assert!(matches!(fx.run(&Fail), Err(TaskError::Action(ref m)) if m == "nope"));

        let mut fx = Fixture::new("debug", json!({ "var": "name" }));
        let out = fx.run(&DebugAction).unwrap();
        assert_eq!(out["name"], json!("web1"));
    }
}
