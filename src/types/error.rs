use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3lock-rs.
///
/// The taxonomy follows "detect, report, abort": configuration errors are
/// caught before any API call, validation errors before any listing work,
/// and everything else terminates the run. There is no retry logic anywhere;
/// transient API failures surface immediately.
///
/// ## Exit Codes
///
/// Each variant maps to a process exit code (via `exit_code()`):
/// - 0: Non-error conditions (Cancelled)
/// - 1: Validation and API failures
/// - 2: Configuration errors (missing credentials/endpoint, bad arguments)
#[derive(Error, Debug, PartialEq)]
pub enum S3LockError {
    /// Missing or malformed credentials, endpoint, or arguments.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bucket name failed the syntactic S3 naming rules.
    #[error("'{0}' is not a valid S3 bucket name")]
    InvalidBucketName(String),

    /// The bucket does not exist on the endpoint.
    #[error("Bucket '{0}' does not exist")]
    BucketNotFound(String),

    /// A bucket with this name already exists (create-bucket only).
    #[error("Bucket '{0}' already exists")]
    BucketAlreadyExists(String),

    /// The bucket exists but object lock is not enabled on it.
    #[error("Bucket '{0}' does not have Object Lock enabled")]
    LockNotEnabled(String),

    /// The caller is not allowed to access the bucket.
    #[error("Access denied to bucket '{0}'")]
    AccessDenied(String),

    /// Any other storage API failure (network, service error, timeout).
    #[error("Storage API error: {0}")]
    Api(String),

    /// Operation cancelled by the user.
    #[error("Operation cancelled by user")]
    Cancelled,
}

impl S3LockError {
    /// Get the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            S3LockError::Cancelled => 0,
            S3LockError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3LockError>() {
        return *err == S3LockError::Cancelled;
    }
    false
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3LockError>() {
        return err.exit_code();
    }
    1
}
