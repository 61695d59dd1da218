//! Running external tools and capturing their results.

use crate::error::{ContainerError, ContainerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::debug;

/// Structured result of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub tool: String,
    pub args: Vec<String>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The invocation as a shell-like string, for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.tool.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Turn a non-zero exit into `ExternalToolFailure`, passing code and stderr through.
    pub fn into_result(self) -> ContainerResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ContainerError::ExternalToolFailure {
                tool: self.tool,
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `tool` with `args` to completion, capturing stdout and stderr.
///
/// Only a failure to start the process is an error here; exit status is
/// reported in the outcome and left for the caller to judge.
pub async fn run_tool(tool: &str, args: Vec<String>) -> ContainerResult<ExecOutcome> {
    let started_at = Utc::now();
    debug!(%tool, args = ?args, "running external tool");

    let output = Command::new(tool).args(&args).output().await.map_err(|e| {
        let reason = if e.kind() == ErrorKind::NotFound { format!("{tool} not found on PATH") } else { e.to_string() };
        ContainerError::ToolUnavailable { tool: tool.to_string(), reason }
    })?;

    let outcome = ExecOutcome {
        tool: tool.to_string(),
        args,
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        started_at,
        finished_at: Utc::now(),
    };
    debug!(command = %outcome.command_line(), exit_code = ?outcome.exit_code, "external tool finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_captures_stdout() {
        let outcome = run_tool("echo", vec!["hello".to_string()]).await.unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "hello");
        assert_eq!(outcome.command_line(), "echo hello");
        assert!(outcome.finished_at >= outcome.started_at);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let outcome = run_tool("sh", vec!["-c".to_string(), "echo oops >&2; exit 3".to_string()])
            .await
            .unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(3));

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        match err {
            ContainerError::ExternalToolFailure { tool, stderr, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(stderr, "oops\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let err = run_tool("boxcar-no-such-tool", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ContainerError::ToolUnavailable { .. }));
    }
}
