//! Template store held in process memory.

use std::sync::RwLock;

use async_trait::async_trait;
use pipeline::{StoreError, TemplateFilter, TemplateRecord, TemplateStore, TenantScope};

/// Template records held in memory.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    records: RwLock<Vec<TemplateRecord>>,
}

impl MemoryTemplateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from `records`, rejecting duplicate `(name, tenant)` pairs.
    pub fn from_records(
        records: impl IntoIterator<Item = TemplateRecord>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Adds a record. Fails if one already exists for the same name and tenant.
    pub fn insert(&self, record: TemplateRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(|p| p.into_inner());
        if records
            .iter()
            .any(|r| r.name == record.name && r.tenant_id == record.tenant_id)
        {
            return Err(StoreError::Duplicate {
                scope: TenantScope::from(record.tenant_id).to_string(),
                name: record.name,
            });
        }
        records.push(record);
        Ok(())
    }

    /// Inserts `record` or replaces the existing record with the same name and tenant.
    pub fn upsert(&self, record: TemplateRecord) {
        let mut records = self.records.write().unwrap_or_else(|p| p.into_inner());
        match records
            .iter_mut()
            .find(|r| r.name == record.name && r.tenant_id == record.tenant_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn find_one(&self, filter: &TemplateFilter) -> Result<Option<TemplateRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(|p| p.into_inner());
        Ok(records.iter().find(|r| filter.matches(r)).cloned())
    }
}
