// Process executor
//
// Runs a built command line through `sh -c` with a wall-clock timeout. Every
// outcome, including spawn failures and timeouts, comes back as an
// ExecutionResult.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::ExecutionResult;

/// Default ceiling for a single tool run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Something that can run a shell command line
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command once. Never fails; errors are reported in the result.
    async fn execute(&self, command: &str) -> ExecutionResult;
}

/// Executes commands with `<shell> -c <command>`
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
    timeout: Duration,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            timeout,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> ExecutionResult {
        info!(command = %command, "Executing command");
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The shell leads its own group so a timeout can take its children too
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %command, error = %e, "Failed to spawn shell");
                return ExecutionResult::failed(format!("Error executing command: {}", e));
            }
        };

        let pgid = child.id();

        // Dropping the wait future on timeout drops the child, which kills it
        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let return_code = output.status.code().unwrap_or(-1);
                ExecutionResult::completed(
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    return_code,
                )
            }
            Ok(Err(e)) => {
                warn!(command = %command, error = %e, "Command failed");
                ExecutionResult::failed(format!("Error executing command: {}", e))
            }
            Err(_) => {
                kill_process_group(pgid);
                warn!(
                    command = %command,
                    timeout_secs = self.timeout.as_secs(),
                    "Command timed out"
                );
                ExecutionResult::failed(format!(
                    "Command execution timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        };

        debug!(
            return_code = result.return_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Command finished"
        );

        result
    }
}

/// SIGKILL everything left in the shell's process group
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    // ESRCH just means the group is already gone
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!(pgid, error = %e, "Process group not killed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let result = ShellExecutor::default().execute("echo 'Hello, World!'").await;
        assert_eq!(result.stdout, "Hello, World!\n");
        assert!(result.stderr.is_empty());
        assert_eq!(result.return_code, 0);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_nonzero_exit_keeps_output() {
        let result = ShellExecutor::default()
            .execute("echo out; echo err >&2; exit 3")
            .await;
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.return_code, 3);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_timeout_kills_and_reports() {
        let executor = ShellExecutor::new(Duration::from_secs(1));
        let start = Instant::now();
        let result = executor.execute("sleep 5").await;

        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(result.return_code, -1);
        assert!(!result.success);
        assert!(result.stdout.is_empty());
        assert_eq!(result.stderr, "Command execution timed out after 1 seconds");
    }

    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let command = format!("(sleep 2; touch {}); true", marker.display());

        let result = ShellExecutor::new(Duration::from_secs(1)).execute(&command).await;
        assert_eq!(result.stderr, "Command execution timed out after 1 seconds");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists(), "subshell outlived the timeout");
    }

    #[tokio::test]
    async fn test_missing_shell_is_reported() {
        let executor = ShellExecutor::default().with_shell("/nonexistent/shell");
        let result = executor.execute("true").await;
        assert_eq!(result.return_code, -1);
        assert!(result.stderr.starts_with("Error executing command: "));
    }
}
