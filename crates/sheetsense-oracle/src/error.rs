//! Error types for oracle calls

use thiserror::Error;

/// Result type alias using [`OracleError`]
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Errors an oracle collaborator can report
///
/// None of these ever cross the layout engine's boundary: callers turn
/// them into a "no match" or a heuristic fallback.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No oracle is configured or it refused the request
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// The oracle did not answer in time
    #[error("Oracle timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport-level failure (network, process, ...)
    #[error("Oracle transport error: {0}")]
    Transport(String),

    /// The oracle process exited unsuccessfully
    #[error("Oracle process exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    /// I/O error talking to the oracle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
