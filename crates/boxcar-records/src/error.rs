use std::path::PathBuf;
use thiserror::Error;

pub type RecordResult<T> = std::result::Result<T, RecordError>;

#[derive(Debug, Error)]
pub enum RecordError {
    /// The archive could not be fetched, opened or does not have the expected layout.
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// A record failed validation. `record` is the zero-based index inside `batch`.
    #[error("malformed record {record} in {batch}: {reason}")]
    MalformedRecord { batch: String, record: u64, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record failed validation outside of any batch, e.g. when encoded directly.
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// Image dimensions are empty or too large to encode.
    #[error("invalid image geometry: {0}")]
    InvalidGeometry(String),

    /// A frame read back from an output file did not validate. `offset` is the byte offset of the frame.
    #[error("corrupt frame at byte {offset}: {reason}")]
    CorruptFrame { offset: u64, reason: String },

    #[error("invalid split assignment: {0}")]
    InvalidAssignment(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    pub(crate) fn source_unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable { path: path.into(), reason: reason.to_string() }
    }

    /// Attach a batch position to a record validation failure; other errors pass through.
    #[must_use]
    pub fn at_position(self, batch: impl Into<String>, record: u64) -> Self {
        match self {
            Self::InvalidRecord { reason } => Self::MalformedRecord { batch: batch.into(), record, reason },
            other => other,
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure { path: path.into(), source }
    }
}
