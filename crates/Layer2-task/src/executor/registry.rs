//! Action plugin registry

use crate::error::TaskResult;
use crate::host::Host;
use crate::loader::ResourceLoader;
use crate::play::PlayContext;
use crate::result::Payload;
use crate::stdin::InputStream;
use crate::task::Task;
use crate::vars::Vars;
use std::collections::HashMap;
use std::sync::Arc;

/// What an action sees while it runs
pub struct ActionContext<'a> {
    pub host: &'a Host,
    pub task: &'a Task,
    /// Arguments with `{{ var }}` references already rendered
    pub args: &'a Vars,
    pub vars: &'a Vars,
    pub play_context: &'a PlayContext,
    pub stdin: &'a mut InputStream,
    pub loader: &'a dyn ResourceLoader,
}

/// A named action a task can invoke
pub trait ActionPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &mut ActionContext<'_>) -> TaskResult<Payload>;
}

/// Action name → plugin. Built once and shared by every worker.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn ActionPlugin>>,
}

impl PluginRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in actions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in super::builtin::all() {
            registry.register_arc(plugin);
        }
        registry
    }

    /// Register a plugin under its own name, replacing any previous one
    pub fn register(&mut self, plugin: impl ActionPlugin + 'static) {
        self.register_arc(Arc::new(plugin));
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn ActionPlugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionPlugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered action names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl ActionPlugin for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn run(&self, _ctx: &mut ActionContext<'_>) -> TaskResult<Payload> {
            Ok(Payload::new())
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = PluginRegistry::with_builtins();
        for name in ["command", "debug", "fail", "pause", "ping", "template"] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_register_custom() {
        let mut registry = PluginRegistry::new();
        assert!(registry.get("noop").is_none());

        registry.register(Noop);
        assert_eq!(registry.names(), vec!["noop"]);
        assert!(registry.get("noop").is_some());
    }
}
