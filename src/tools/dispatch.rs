// Tool dispatch: decode, validate, build, execute
//
// The executor is only reached once the builder has accepted the request.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::builder::{BuiltCommand, CommandBuilder};
use super::executor::CommandExecutor;
use super::types::{ExecutionResult, ToolKind, ToolRequest};
use super::validation::ValidationError;

/// Why a dispatch produced no ExecutionResult
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct ToolDispatcher {
    builder: CommandBuilder,
    executor: Arc<dyn CommandExecutor>,
    /// Where resource scripts are written; the system temp dir when unset
    script_dir: Option<PathBuf>,
}

impl ToolDispatcher {
    pub fn new(builder: CommandBuilder, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            builder,
            executor,
            script_dir: None,
        }
    }

    pub fn with_script_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.script_dir = dir;
        self
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// Decode and validate a request body without running anything
    pub fn prepare(&self, kind: ToolKind, body: Value) -> Result<BuiltCommand, ValidationError> {
        let request = ToolRequest::from_json(kind, body)?;
        self.builder.build(&request)
    }

    /// Execute a built command
    pub async fn run(&self, command: &BuiltCommand) -> Result<ExecutionResult> {
        match command {
            BuiltCommand::Shell(line) => Ok(self.executor.execute(line).await),
            BuiltCommand::MsfResource { script } => {
                // Kept alive until msfconsole has exited
                let mut builder = tempfile::Builder::new();
                builder.prefix("kali-mcp-").suffix(".rc");
                let mut resource = match &self.script_dir {
                    Some(dir) => builder.tempfile_in(dir),
                    None => builder.tempfile(),
                }
                .context("Failed to create metasploit resource script")?;
                resource
                    .write_all(script.as_bytes())
                    .context("Failed to write metasploit resource script")?;
                resource.flush()?;

                debug!(
                    path = %resource.path().display(),
                    script = %script,
                    "Created metasploit resource script"
                );

                let path = resource.path().display().to_string();
                let line = format!("msfconsole -q -r {}", shell_quote(&path));
                Ok(self.executor.execute(&line).await)
            }
        }
    }

    #[instrument(skip(self, body), fields(tool = %kind))]
    pub async fn dispatch(&self, kind: ToolKind, body: Value) -> Result<ExecutionResult, DispatchError> {
        let command = self.prepare(kind, body)?;
        info!(command = ?command, "Dispatching tool");
        Ok(self.run(&command).await?)
    }
}

/// Single-quote a word for `sh`
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
