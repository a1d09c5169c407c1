//! Error taxonomy and retry-policy types for the Nodeflow domain.
//!
//! [`ServiceError`] is the single taxonomy every invocation failure is reported
//! in. Infrastructure crates define their own error enums and convert into it;
//! the dispatch shell maps each variant to a transport status with
//! [`ServiceError::status`] and [`ServiceError::code`].
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let the caller decide whether to
/// re-issue an operation.
///
/// - `Retryable` errors: the endpoint could not be reached, the attempt timed
///   out, or the transfer ended before the response was complete.
/// - `NonRetryable` errors: the endpoint answered with an error status or with
///   a payload of unexpected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried; the failure surfaces immediately.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Invocation errors
// ---------------------------------------------------------------------------

/// Every way an invocation can fail.
///
/// The `Display` text is the developer-facing message; [`ServiceError::user_message`]
/// is safe to show to the caller. Variants never carry payload contents or the
/// caller's identity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// No credential was presented.
    #[error("Authorization header missing or empty")]
    AuthMissing,

    /// The credential was valid but its expiry has passed.
    #[error("Token has expired")]
    AuthExpired,

    /// The credential could not be verified (bad signature, malformed claims,
    /// unsupported algorithm).
    #[error("Could not validate credentials: {reason}")]
    AuthInvalid {
        /// What the verifier rejected.
        reason: String,
    },

    /// The caller is authenticated but lacks a required permission.
    #[error("Permission '{permission}' is required")]
    AuthForbidden {
        /// The permission that was required.
        permission: String,
    },

    /// The request body could not be decoded into a payload mapping.
    #[error("YAML parsing error: {reason}")]
    InvalidPayload {
        /// Decoder detail.
        reason: String,
    },

    /// No node is registered under the requested name.
    #[error("Node '{name}' not found")]
    NodeNotFound {
        /// The requested node name.
        name: String,
    },

    /// The payload lacks a field the node requires.
    #[error("{node} requires '{field}' in the payload")]
    MissingInput {
        /// Node that rejected the payload.
        node: String,
        /// The missing field.
        field: String,
    },

    /// Neither a tenant-specific nor a global template exists for the name.
    #[error("Could not load '{name}' template")]
    TemplateMissing {
        /// The template name that was looked up.
        name: String,
    },

    /// The model produced output that a structured node cannot use.
    #[error("AI model returned malformed data. Raw output: {raw_output}")]
    MalformedGenerationOutput {
        /// The unparsed generation output.
        raw_output: String,
    },

    /// The generation service stayed unreachable for every allowed attempt.
    #[error("Could not reach the generation service after {attempts} attempts")]
    GenerationUnavailable {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The generation service answered but the call failed and must not be retried.
    #[error("Generation failed: {reason}")]
    GenerationFailed {
        /// Upstream status or decoding problem.
        reason: String,
    },

    /// The caller abandoned the invocation before it completed.
    #[error("Invocation cancelled")]
    Cancelled,

    /// An unanticipated fault outside the named taxonomy.
    #[error("Internal error: {message}")]
    Internal {
        /// Diagnostic detail for operators.
        message: String,
    },
}

impl ServiceError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::AuthMissing => "AUTH_MISSING",
            ServiceError::AuthExpired => "AUTH_EXPIRED",
            ServiceError::AuthInvalid { .. } => "AUTH_INVALID",
            ServiceError::AuthForbidden { .. } => "AUTH_FORBIDDEN",
            ServiceError::InvalidPayload { .. } => "INVALID_YAML",
            ServiceError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            ServiceError::MissingInput { .. } => "NODE_EXECUTION_ERROR",
            ServiceError::TemplateMissing { .. } => "TEMPLATE_MISSING",
            ServiceError::MalformedGenerationOutput { .. } => "MALFORMED_GENERATION_OUTPUT",
            ServiceError::GenerationUnavailable { .. } => "GENERATION_UNAVAILABLE",
            ServiceError::GenerationFailed { .. } => "GENERATION_FAILED",
            ServiceError::Cancelled => "CANCELLED",
            ServiceError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP-style status the dispatch shell should answer with.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::AuthMissing
            | ServiceError::AuthExpired
            | ServiceError::AuthInvalid { .. } => 401,
            ServiceError::AuthForbidden { .. } => 403,
            ServiceError::NodeNotFound { .. } => 404,
            ServiceError::InvalidPayload { .. } | ServiceError::MissingInput { .. } => 400,
            ServiceError::Cancelled => 499,
            ServiceError::GenerationUnavailable { .. } => 503,
            ServiceError::TemplateMissing { .. }
            | ServiceError::MalformedGenerationOutput { .. }
            | ServiceError::GenerationFailed { .. }
            | ServiceError::Internal { .. } => 500,
        }
    }

    /// Message suitable for the caller; never includes upstream raw output.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::AuthMissing
            | ServiceError::AuthForbidden { .. }
            | ServiceError::NodeNotFound { .. }
            | ServiceError::MissingInput { .. } => self.to_string(),
            ServiceError::AuthExpired => "Your session has expired. Please sign in again.".into(),
            ServiceError::AuthInvalid { .. } => "Could not validate credentials.".into(),
            ServiceError::InvalidPayload { .. } => {
                "The provided request body is not valid YAML.".into()
            }
            ServiceError::TemplateMissing { .. } => {
                "The service is missing a required prompt template.".into()
            }
            ServiceError::MalformedGenerationOutput { .. } => {
                "The AI model returned data that could not be understood.".into()
            }
            ServiceError::GenerationUnavailable { .. } => {
                "The AI service is temporarily unavailable. Please try again later.".into()
            }
            ServiceError::GenerationFailed { .. } => {
                "The AI service could not complete the request.".into()
            }
            ServiceError::Cancelled => "The request was cancelled.".into(),
            ServiceError::Internal { .. } => {
                "An unexpected error occurred while processing your request.".into()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`crate::TemplateStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A second record was offered for an existing `(name, tenant)` pair.
    #[error("Template '{name}' already exists for scope '{scope}'")]
    Duplicate {
        /// Template name.
        name: String,
        /// Tenant id, or `global`.
        scope: String,
    },

    /// The backing store could not be read.
    #[error("Template store unavailable: {message}")]
    Unavailable {
        /// Backend-specific detail.
        message: String,
    },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal {
            message: err.to_string(),
        }
    }
}
