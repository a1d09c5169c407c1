//! Per-tenant prompt template cache with TTL freshness and global fallback.
//!
//! One [`TemplateCache`] is built at process start and shared by handle. Entries
//! are replaced whole; there is no background eviction. A stale entry is simply
//! overwritten by the next read that misses. Concurrent refills of one key race
//! harmlessly: every writer stores the value the store held at that moment.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::{
    Clock, ServiceError, SystemClock, TemplateFilter, TemplateStore, TenantId, TenantScope,
    Timestamp,
};

/// Default freshness window for cached templates (15 minutes).
pub const DEFAULT_TEMPLATE_TTL: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: TenantScope,
    name: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    loaded_at: Timestamp,
}

/// Caches template bodies per `(tenant, name)` in front of a [`TemplateStore`].
pub struct TemplateCache {
    store: Arc<dyn TemplateStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: DashMap<CacheKey, CacheEntry>,
}

impl TemplateCache {
    /// Creates a cache over `store` using the system clock.
    pub fn new(store: Arc<dyn TemplateStore>, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    /// Creates a cache over `store` reading time from `clock`.
    pub fn with_clock(store: Arc<dyn TemplateStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// The configured freshness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the template body for `name` as seen by `tenant_id`.
    ///
    /// A fresh cache entry is served without touching the store. Otherwise the
    /// tenant's own record is looked up, then the global default. Whatever is
    /// found is cached under the key that was asked for. Absence is never
    /// cached, so a newly written template is visible on the very next call.
    pub async fn get_template(
        &self,
        name: &str,
        tenant_id: Option<&TenantId>,
    ) -> Result<String, ServiceError> {
        let key = CacheKey {
            scope: TenantScope::from(tenant_id.cloned()),
            name: name.to_owned(),
        };
        let now = self.clock.now();

        let cached = self
            .entries
            .get(&key)
            .filter(|entry| now.saturating_elapsed_since(entry.loaded_at) < self.ttl)
            .map(|entry| entry.body.clone());
        if let Some(body) = cached {
            debug!(template = name, scope = %key.scope, "Returning cached template");
            return Ok(body);
        }

        info!(template = name, scope = %key.scope, "Template cache miss or stale; fetching from store");

        let mut record = match tenant_id {
            Some(tenant) => {
                self.store
                    .find_one(&TemplateFilter::for_tenant(name, tenant.clone()))
                    .await?
            }
            None => None,
        };

        if record.is_none() {
            if tenant_id.is_some() {
                warn!(template = name, scope = %key.scope, "No tenant-specific template; falling back to global default");
            }
            record = self.store.find_one(&TemplateFilter::global(name)).await?;
        }

        match record {
            Some(record) => {
                self.entries.insert(
                    key,
                    CacheEntry {
                        body: record.body.clone(),
                        loaded_at: now,
                    },
                );
                info!(template = name, "Loaded and cached template");
                Ok(record.body)
            }
            None => {
                warn!(template = name, "Template not found for tenant or as global default");
                Err(ServiceError::TemplateMissing {
                    name: name.to_owned(),
                })
            }
        }
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a fresh entry exists for `name` under `tenant_id`'s key.
    pub fn is_cached(&self, name: &str, tenant_id: Option<&TenantId>) -> bool {
        let key = CacheKey {
            scope: TenantScope::from(tenant_id.cloned()),
            name: name.to_owned(),
        };
        let now = self.clock.now();
        self.entries
            .get(&key)
            .is_some_and(|entry| now.saturating_elapsed_since(entry.loaded_at) < self.ttl)
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
