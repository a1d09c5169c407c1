//! Nodeflow template store adapters.
//!
//! Implements the [`pipeline::TemplateStore`] trait with two backends:
//!
//! - [`MemoryTemplateStore`]: records held in process memory. Used by tests and
//!   as the backing structure of the file store.
//! - [`YamlFileTemplateStore`]: records read from a YAML document on every
//!   lookup, so edits to the file need no restart.
//!
//! Both enforce uniqueness of `(name, tenant_id)`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Storage formats live here. The [`pipeline`] crate sees
//! only [`pipeline::TemplateStore`].

mod file;
mod memory;

pub use file::{TemplateDocument, YamlFileTemplateStore};
pub use memory::MemoryTemplateStore;
