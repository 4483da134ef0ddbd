use thiserror::Error;

/// Failures of core operations. A lookup that finds nothing is not an error;
/// stores return `Option` for that.
#[derive(Error, Debug)]
pub enum StudyHubError {
    /// A required request field was missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller's identity does not match the identity being acted on.
    #[error("Unauthorized")]
    Unauthorized,

    /// The underlying database could not serve the operation. Never retried here.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

/// Result type alias for store and ledger operations.
pub type StudyHubResult<T> = std::result::Result<T, StudyHubError>;
