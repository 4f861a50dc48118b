//! Shell command execution
//!
//! Runs agent-requested commands through `sh -c` with a hard timeout.
//! Output is truncated to a speakable length; a failing command is still
//! a tool result, not a tool error, so the assistant can report it.

use std::time::Duration;

use crate::{Error, Result};

/// Hard wall-clock limit per command
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of command output handed back for speech
const OUTPUT_LIMIT: usize = 500;

/// Run a shell command, capturing truncated output
///
/// # Errors
///
/// Returns error if the command cannot be spawned or exceeds the timeout
pub async fn run_command(command: &str) -> Result<String> {
    tracing::info!(command, "running shell command");

    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd
        .spawn()
        .map_err(|e| Error::Tool(format!("failed to spawn command: {e}")))?;

    let output = tokio::time::timeout(COMMAND_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| Error::Tool("command timed out (30s)".to_string()))?
        .map_err(|e| Error::Tool(format!("command process error: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        if stdout.trim().is_empty() {
            Ok("Command completed with no output.".to_string())
        } else {
            Ok(truncate_output(stdout.trim()))
        }
    } else {
        Ok(format!(
            "Command exited with {}: {}",
            output.status,
            truncate_output(stderr.trim())
        ))
    }
}

/// Cap output at a speakable length
fn truncate_output(output: &str) -> String {
    if output.chars().count() > OUTPUT_LIMIT {
        let truncated: String = output.chars().take(OUTPUT_LIMIT).collect();
        format!("{truncated} [truncated]")
    } else {
        output.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_returns_stdout() {
        let result = run_command("echo hello").await.unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn silent_success_is_reported() {
        let result = run_command("true").await.unwrap();
        assert_eq!(result, "Command completed with no output.");
    }

    #[tokio::test]
    async fn failing_command_reports_exit_status() {
        let result = run_command("ls /definitely/not/a/path").await.unwrap();
        assert!(result.starts_with("Command exited with"));
    }

    #[test]
    fn long_output_is_truncated() {
        let long = "x".repeat(2000);
        let truncated = truncate_output(&long);
        assert!(truncated.ends_with("[truncated]"));
        assert!(truncated.chars().count() <= OUTPUT_LIMIT + 20);
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("fine"), "fine");
    }
}
