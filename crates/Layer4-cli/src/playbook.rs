//! Playbook file - a single play in JSON
//!
//! ```json
//! {
//!   "name": "site",
//!   "vars": { "http_port": 80 },
//!   "context": { "connection": "local", "timeout": 30 },
//!   "hosts": [{ "name": "web1", "groups": ["web"] }],
//!   "tasks": [{ "name": "check", "action": "ping" }]
//! }
//! ```

use fleet_foundation::{Error, Result};
use fleet_task::{Host, Play, PlayContext, Task, Vars};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub vars: Vars,

    #[serde(default)]
    pub context: PlayContext,

    pub hosts: Vec<Host>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Playbook {
    /// Read and validate a playbook file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let playbook: Playbook = serde_json::from_str(content)
            .map_err(|e| Error::Playbook(format!("invalid playbook: {}", e)))?;
        playbook.validate()?;
        Ok(playbook)
    }

    fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(Error::Inventory("playbook has no hosts".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for host in &self.hosts {
            if host.name.is_empty() {
                return Err(Error::Inventory("host with empty name".to_string()));
            }
            if !seen.insert(host.name.as_str()) {
                return Err(Error::Inventory(format!("duplicate host: {}", host.name)));
            }
        }

        for (i, task) in self.tasks.iter().enumerate() {
            if task.action.is_empty() {
                return Err(Error::Playbook(format!("task #{} has no action", i + 1)));
            }
        }
        Ok(())
    }

    pub fn play(&self) -> Play {
        Play {
            name: self.name.clone(),
            vars: self.vars.clone(),
        }
    }

    /// Tasks with names filled in from their action
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .cloned()
            .map(|mut task| {
                if task.name.is_empty() {
                    task.name = task.action.clone();
                }
                task
            })
            .collect()
    }
}

/// Parse `key=value`. The value is read as JSON when it parses, otherwise as
/// a plain string.
pub fn parse_extra_var(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::InvalidInput(format!("expected key=value, got '{}'", raw)))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput(format!("empty variable name in '{}'", raw)));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SITE: &str = r#"{
        "name": "site",
        "vars": { "http_port": 80 },
        "context": { "timeout": 5 },
        "hosts": [
            { "name": "web1", "groups": ["web"] },
            { "name": "db1", "vars": { "role": "primary" } }
        ],
        "tasks": [
            { "action": "ping" },
            { "name": "say hi", "action": "debug", "args": { "msg": "hi {{ inventory_hostname }}" } }
        ]
    }"#;

    #[test]
    fn test_parse_playbook() {
        let playbook = Playbook::parse(SITE).unwrap();
        assert_eq!(playbook.hosts.len(), 2);
        assert_eq!(playbook.context.timeout, 5);
        assert_eq!(playbook.context.connection, "local");
        assert_eq!(playbook.play().vars["http_port"], json!(80));

        let tasks = playbook.tasks();
        assert_eq!(tasks[0].name, "ping");
        assert_eq!(tasks[1].name, "say hi");
        assert_ne!(tasks[0].id, tasks[1].id);
    }

    #[test]
    fn test_rejects_bad_inventory() {
        let err = Playbook::parse(r#"{ "hosts": [] }"#).unwrap_err();
        assert!(matches!(err, Error::Inventory(_)));

        let err = Playbook::parse(r#"{ "hosts": [{ "name": "a" }, { "name": "a" }] }"#).unwrap_err();
        assert!(err.to_string().contains("duplicate host"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Playbook::parse("{ nope").unwrap_err();
        assert!(matches!(err, Error::Playbook(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Playbook::load(&dir.path().join("site.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        std::fs::write(&path, SITE).unwrap();
        assert_eq!(Playbook::load(&path).unwrap().name, "site");
    }

    #[test]
    fn test_parse_extra_var() {
        assert_eq!(parse_extra_var("port=8080").unwrap(), ("port".into(), json!(8080)));
        assert_eq!(parse_extra_var("env=prod").unwrap(), ("env".into(), json!("prod")));
        assert_eq!(
            parse_extra_var("msg=a=b").unwrap(),
            ("msg".into(), json!("a=b"))
        );
        assert!(parse_extra_var("novalue").is_err());
        assert!(parse_extra_var("=x").is_err());
    }
}
