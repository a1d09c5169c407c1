//! Template store backed by a YAML document on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{StoreError, TemplateFilter, TemplateRecord, TemplateStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::MemoryTemplateStore;

/// On-disk layout of a template file.
///
/// ```yaml
/// templates:
///   - name: clean_invoice
///     body: "Extract: {invoice_data}"
///   - name: clean_invoice
///     tenant_id: acme
///     body: "Acme layout. Extract: {invoice_data}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    /// Every stored record; a record without `tenant_id` is the global default.
    #[serde(default)]
    pub templates: Vec<TemplateRecord>,
}

/// Templates read from a YAML file.
///
/// The file is the source of truth: every lookup re-reads it, so edits are
/// visible to the next lookup. Put a [`pipeline::TemplateCache`] in front to
/// bound how often that happens.
#[derive(Debug, Clone)]
pub struct YamlFileTemplateStore {
    path: PathBuf,
}

impl YamlFileTemplateStore {
    /// Opens the file at `path`, failing if it cannot be read or validated.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        let records = store.snapshot().await?;
        info!(path = %store.path.display(), records = records.len(), "Opened template file");
        Ok(store)
    }

    /// The file this store reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the current file contents.
    pub async fn snapshot(&self) -> Result<MemoryTemplateStore, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("cannot read {}: {e}", self.path.display()),
            })?;
        Self::parse(&text).map_err(|e| match e {
            StoreError::Unavailable { message } => StoreError::Unavailable {
                message: format!("{}: {message}", self.path.display()),
            },
            other => other,
        })
    }

    /// Parses a template document, rejecting duplicate `(name, tenant)` pairs.
    pub fn parse(text: &str) -> Result<MemoryTemplateStore, StoreError> {
        let document: TemplateDocument =
            serde_yaml::from_str(text).map_err(|e| StoreError::Unavailable {
                message: format!("invalid template document: {e}"),
            })?;
        MemoryTemplateStore::from_records(document.templates)
    }
}

#[async_trait]
impl TemplateStore for YamlFileTemplateStore {
    async fn find_one(&self, filter: &TemplateFilter) -> Result<Option<TemplateRecord>, StoreError> {
        debug!(path = %self.path.display(), template = %filter.name, "Reading template file");
        self.snapshot().await?.find_one(filter).await
    }
}
