//! Shell tools: guarded command execution and the working directory probe.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use crate::safety::SafetyPolicy;

use super::{required_str, Tool};

/// Run a shell command with a wall-clock timeout. The deny-list is checked
/// before anything is spawned.
pub struct ExecuteCommand {
    policy: Arc<SafetyPolicy>,
    timeout: Duration,
}

impl ExecuteCommand {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>, timeout: Duration) -> Self {
        Self { policy, timeout }
    }
}

#[async_trait]
impl Tool for ExecuteCommand {
    fn name(&self) -> &'static str {
        "executeCommand"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command and return its output. Use with caution!"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The shell command to execute"}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let command = match required_str(args, "command") {
            Ok(command) => command,
            Err(msg) => return msg,
        };
        if let Err(blocked) = self.policy.check_command(command) {
            return blocked;
        }
        debug!(command, "executing shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.policy.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return format!("Error executing command: {err}"),
            Err(_) => {
                return format!(
                    "Error executing command: timed out after {} seconds",
                    self.timeout.as_secs()
                )
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stderr.is_empty() {
            return format!("Command executed with warnings:\n{stdout}\n\nWarnings/Errors:\n{stderr}");
        }
        if stdout.is_empty() {
            "Command executed successfully (no output)".to_string()
        } else {
            stdout
        }
    }
}

/// Report the working directory commands run in.
pub struct GetCurrentDirectory {
    policy: Arc<SafetyPolicy>,
}

impl GetCurrentDirectory {
    /// Build the tool.
    #[must_use]
    pub fn new(policy: Arc<SafetyPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for GetCurrentDirectory {
    fn name(&self) -> &'static str {
        "getCurrentDirectory"
    }

    fn description(&self) -> &'static str {
        "Get the current working directory path"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _args: &Value) -> String {
        format!("Current directory: {}", self.policy.working_dir().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Arc<SafetyPolicy>) {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(SafetyPolicy::new(
            &[dir.path().to_path_buf()],
            dir.path().to_path_buf(),
        ));
        (dir, policy)
    }

    #[tokio::test]
    async fn test_command_output_is_returned() {
        let (_dir, policy) = setup();
        let tool = ExecuteCommand::new(policy, Duration::from_secs(30));
        let result = tool.execute(&json!({"command": "echo hello"})).await;
        assert_eq!(result, "hello\n");
    }

    #[tokio::test]
    async fn test_empty_output_is_reported() {
        let (_dir, policy) = setup();
        let tool = ExecuteCommand::new(policy, Duration::from_secs(30));
        let result = tool.execute(&json!({"command": "true"})).await;
        assert_eq!(result, "Command executed successfully (no output)");
    }

    #[tokio::test]
    async fn test_stderr_is_surfaced_as_warnings() {
        let (_dir, policy) = setup();
        let tool = ExecuteCommand::new(policy, Duration::from_secs(30));
        let result = tool
            .execute(&json!({"command": "echo out; echo warn >&2"}))
            .await;
        assert!(result.starts_with("Command executed with warnings:"), "got: {result}");
        assert!(result.contains("out"));
        assert!(result.contains("warn"));
    }

    #[tokio::test]
    async fn test_dangerous_command_never_spawns() {
        let (dir, policy) = setup();
        let marker = dir.path().join("should_not_exist");
        let tool = ExecuteCommand::new(policy, Duration::from_secs(30));
        let result = tool
            .execute(&json!({"command": format!("sudo touch {}", marker.display())}))
            .await;
        assert!(result.starts_with("BLOCKED:"), "got: {result}");
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_timeout_is_a_result_string() {
        let (_dir, policy) = setup();
        let tool = ExecuteCommand::new(policy, Duration::from_millis(100));
        let result = tool.execute(&json!({"command": "sleep 5"})).await;
        assert!(result.starts_with("Error executing command: timed out"), "got: {result}");
    }

    #[tokio::test]
    async fn test_commands_run_in_the_policy_working_dir() {
        let (dir, policy) = setup();
        let tool = ExecuteCommand::new(policy, Duration::from_secs(30));
        let result = tool.execute(&json!({"command": "pwd"})).await;
        assert_eq!(
            result.trim(),
            dir.path().canonicalize().unwrap().display().to_string()
        );
    }

    #[tokio::test]
    async fn test_get_current_directory() {
        let (dir, policy) = setup();
        let tool = GetCurrentDirectory::new(policy);
        let result = tool.execute(&json!({})).await;
        assert_eq!(
            result,
            format!("Current directory: {}", dir.path().display())
        );
    }
}
