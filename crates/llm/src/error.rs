//! Generation failures and their mapping onto `ServiceError`.

use pipeline::{RetryPolicy, ServiceError};
use thiserror::Error;

use crate::framing::FramingError;

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failures of a single attempt or of the whole retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The endpoint could not be reached, or the attempt timed out.
    #[error("generation endpoint unreachable: {reason}")]
    Unreachable { reason: String },

    /// The final fragment did not mark the response as done.
    #[error("incomplete response from generation endpoint")]
    Incomplete,

    /// The endpoint answered with a non-success status.
    #[error("generation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not follow the fragment framing.
    #[error("unexpected response shape: {reason}")]
    Malformed { reason: String },

    /// The client could not be built from its configuration.
    #[error("invalid generation client configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts; last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The caller cancelled the call.
    #[error("cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Whether the failed attempt may be repeated.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            GenerationError::Unreachable { .. } | GenerationError::Incomplete => {
                RetryPolicy::Retryable { after: None }
            }
            _ => RetryPolicy::NonRetryable,
        }
    }
}

impl From<FramingError> for GenerationError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Incomplete => GenerationError::Incomplete,
            other => GenerationError::Malformed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Exhausted { attempts, .. } => {
                ServiceError::GenerationUnavailable { attempts }
            }
            GenerationError::Unreachable { .. } | GenerationError::Incomplete => {
                ServiceError::GenerationUnavailable { attempts: 1 }
            }
            GenerationError::Cancelled => ServiceError::Cancelled,
            GenerationError::InvalidConfiguration { reason } => ServiceError::Internal {
                message: reason,
            },
            other @ (GenerationError::Status { .. } | GenerationError::Malformed { .. }) => {
                ServiceError::GenerationFailed {
                    reason: other.to_string(),
                }
            }
        }
    }
}
