// Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kali_mcp::config::Config;
use kali_mcp::tools::{CommandExecutor, ExecutionResult};
use std::sync::{Arc, Mutex};

/// Executor that records command lines instead of running them
///
/// Metasploit resource scripts are read while the temp file still exists.
#[derive(Default)]
pub struct SpyExecutor {
    commands: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
    stdout: String,
}

impl SpyExecutor {
    pub fn with_stdout(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for SpyExecutor {
    async fn execute(&self, command: &str) -> ExecutionResult {
        self.commands.lock().unwrap().push(command.to_string());

        if let Some(path) = command.strip_prefix("msfconsole -q -r ") {
            let script = std::fs::read_to_string(path.trim_matches('\'')).unwrap_or_default();
            self.scripts.lock().unwrap().push(script);
        }

        ExecutionResult::completed(self.stdout.clone(), String::new(), 0)
    }
}

pub fn spy() -> Arc<SpyExecutor> {
    Arc::new(SpyExecutor::with_stdout("ok\n"))
}

pub fn config(debug: bool) -> Config {
    let mut config = Config::default();
    config.debug.enabled = debug;
    config
}

/// Executor whose every call panics
pub struct PanickingExecutor;

#[async_trait]
impl CommandExecutor for PanickingExecutor {
    async fn execute(&self, command: &str) -> ExecutionResult {
        panic!("executor exploded on {}", command);
    }
}
