//! Error types for container and storage operations.

use std::io;
use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// Errors that can occur while driving external tools.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// An external tool ran and exited unsuccessfully. Its exit code and stderr are passed through as-is.
    #[error("{tool} exited with {}: {stderr}", describe_exit(.code))]
    ExternalToolFailure { tool: String, code: Option<i32>, stderr: String },

    /// The tool could not be started at all.
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// Image reference could not be parsed or lacks a required part.
    #[error("Invalid image reference: {0}")]
    InvalidImageRef(String),

    /// Hyperparameters are not a JSON object.
    #[error("Invalid hyperparameters: {0}")]
    InvalidHyperparameters(String),

    /// Object storage destination is incomplete.
    #[error("Invalid storage target: {0}")]
    InvalidStorageTarget(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
}

impl ContainerError {
    /// Exit code to hand back to the operator for this failure, if it came from a tool.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExternalToolFailure { code, .. } => *code,
            _ => None,
        }
    }
}
