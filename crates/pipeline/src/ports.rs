//! Port traits implemented by infrastructure crates.
//!
//! The domain defines *what* it needs from the outside world; the `store` and
//! `llm` crates define *how* to supply it.

use async_trait::async_trait;

use crate::{GenerationRequest, ServiceError, StoreError, TemplateFilter, TemplateRecord};

/// Read access to the persisted prompt templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Returns the single record matching `filter` exactly, if any.
    async fn find_one(&self, filter: &TemplateFilter) -> Result<Option<TemplateRecord>, StoreError>;
}

/// The external text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `request` and returns the raw model output.
    ///
    /// The output is expected, but not guaranteed, to be JSON text; callers
    /// decide how strictly to parse it.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError>;
}
