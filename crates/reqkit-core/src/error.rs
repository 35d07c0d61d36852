//! Error types for the reqkit core.

/// Core error type for process-level concerns.
#[derive(Debug, thiserror::Error)]
pub enum ReqkitError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for core operations.
pub type ReqkitResult<T> = Result<T, ReqkitError>;
