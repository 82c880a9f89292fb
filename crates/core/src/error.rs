use thiserror::Error;

pub type LiveOpsResult<T> = Result<T, LiveOpsError>;

#[derive(Error, Debug)]
pub enum LiveOpsError {
    /// Rejected before any query executes; names the violated constraint.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Event store unreachable or returned a malformed row. Never retried
    /// here; the whole computation fails rather than returning a partial
    /// cohort table.
    #[error("Event store query failed: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
