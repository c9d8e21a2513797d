use std::path::PathBuf;

use thiserror::Error;

/// Audit trail error types.
///
/// The controller never surfaces these to the operator; they are logged at
/// the point of failure and the status check carries on.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Opening or writing the trail file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sink no longer accepts records
    #[error("Audit sink closed")]
    Closed,

    /// Record could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl AuditError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Specialized result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;
