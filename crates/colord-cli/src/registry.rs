//! Command registry
//!
//! Commands take a flat property set and hand back a result set, so the
//! same command can be driven from the CLI or from a config file.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use crate::column_size::ColumnSizeCommand;
use crate::evaluation::WorkloadEvaluationCommand;

pub type Properties = BTreeMap<String, String>;

/// A runnable command
#[async_trait]
pub trait Command: Send + Sync {
    /// Run to completion. Failures are reported through `success=false`.
    async fn execute(&self, params: Properties) -> Properties;
}

type CommandConstructor = fn() -> Box<dyn Command>;

pub const WORKLOAD_EVALUATION: &str = "WORKLOAD_EVALUATION";
pub const GET_COLUMN_SIZE: &str = "GET_COLUMN_SIZE";

/// Maps command identifiers to their constructors
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandConstructor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(WORKLOAD_EVALUATION, || Box::new(WorkloadEvaluationCommand));
        registry.register(GET_COLUMN_SIZE, || Box::new(ColumnSizeCommand));
        registry
    }

    pub fn register(&mut self, id: &'static str, constructor: CommandConstructor) {
        self.commands.insert(id, constructor);
    }

    /// Instantiate a command, matching the identifier case-insensitively.
    pub fn get(&self, id: &str) -> Option<Box<dyn Command>> {
        self.commands
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(id))
            .map(|(_, ctor)| ctor())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.commands.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands() {
        let registry = CommandRegistry::with_builtin();
        assert_eq!(registry.ids(), vec![GET_COLUMN_SIZE, WORKLOAD_EVALUATION]);
        assert!(registry.get("workload_evaluation").is_some());
        assert!(registry.get("ORDERING").is_none());
    }

    #[tokio::test]
    async fn test_get_column_size_without_dir_fails() {
        let registry = CommandRegistry::with_builtin();
        let command = registry.get(GET_COLUMN_SIZE).unwrap();
        let results = command.execute(Properties::new()).await;
        assert_eq!(results["success"], "false");
    }
}
