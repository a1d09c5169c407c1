//! Core orchestration domain for Nodeflow.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and the error taxonomy used throughout the workspace, plus the one
//! piece of stateful domain logic: the tenant-aware [`TemplateCache`].
//! Infrastructure crates implement the traits defined here; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`UserId`, `TenantId`, `CorrelationId`) |
//! | [`types`] | Value types (`Identity`, `TemplateRecord`, `GenerationRequest`, `Timestamp`) |
//! | [`payload`] | The key/value [`Payload`] threaded through a node |
//! | [`errors`] | [`ServiceError`] taxonomy, [`StoreError`], [`RetryPolicy`] |
//! | [`ports`] | [`TemplateStore`] and [`TextGenerator`] traits |
//! | [`clock`] | [`Clock`] abstraction with system and manual clocks |
//! | [`template`] | `{placeholder}` rendering |
//! | [`template_cache`] | [`TemplateCache`] |

pub mod clock;
pub mod errors;
pub mod identifiers;
pub mod payload;
pub mod ports;
pub mod template;
pub mod template_cache;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{RetryPolicy, ServiceError, StoreError};
pub use identifiers::{CorrelationId, TenantId, UserId};
pub use payload::{Payload, IDENTITY_KEY};
pub use ports::{TemplateStore, TextGenerator};
pub use template_cache::{TemplateCache, DEFAULT_TEMPLATE_TTL};
pub use types::{
    GenerationRequest, Identity, TemplateFilter, TemplateRecord, TenantScope, Timestamp,
};
