//! Nodeflow generation client.
//!
//! Implements the [`pipeline::TextGenerator`] trait against a text-generation
//! endpoint that accepts `{model, prompt, system, stream, format}` and answers
//! with newline-delimited JSON fragments.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response framing,
//! and exponential back-off all live here. The [`pipeline`] crate sees only
//! [`pipeline::TextGenerator`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`backoff`] | [`BackoffPolicy`]: attempts and delay schedule |
//! | [`framing`] | NDJSON fragment parser; the only code that knows the wire format |
//! | [`transport`] | [`GenerationTransport`] trait and the reqwest-backed [`HttpTransport`] |
//! | [`client`] | [`GenerationClient`]: retry loop, attempt timeout, cancellation |

pub mod backoff;
pub mod client;
pub mod error;
pub mod framing;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use client::{GenerationClient, DEFAULT_ATTEMPT_TIMEOUT};
pub use error::{GenerationError, GenerationResult};
pub use transport::{GenerateBody, GenerationTransport, HttpTransport};
pub use tokio_util::sync::CancellationToken;
