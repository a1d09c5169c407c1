//! Shared value types for the Nodeflow domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (an identity's permission set, the scope
//! a template applies to) and participate in domain computations.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TenantId, UserId};

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The authenticated caller of one invocation.
///
/// Produced once per call by the credential verifier from verified token
/// claims. Immutable and call-scoped: it is never persisted and never leaves
/// the pipeline in an output payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Caller identifier (`id` claim).
    pub id: UserId,
    /// Tenant the caller acts for; selects tenant-specific templates.
    pub tenant_id: TenantId,
    /// Caller e-mail address.
    pub email: String,
    /// Granted permission names. Empty when the token carries none.
    pub permissions: BTreeSet<String>,
}

impl Identity {
    /// Returns `true` if `permission` was granted to this caller.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// The scope a prompt template applies to.
///
/// `Global` is a dedicated variant rather than an empty tenant string, so a
/// global default can never collide with a tenant entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantScope {
    /// The default template shared by every tenant.
    Global,
    /// An override owned by one tenant.
    Tenant(TenantId),
}

impl From<Option<TenantId>> for TenantScope {
    fn from(tenant: Option<TenantId>) -> Self {
        tenant.map_or(TenantScope::Global, TenantScope::Tenant)
    }
}

impl std::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantScope::Global => write!(f, "global"),
            TenantScope::Tenant(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------

/// A stored prompt template.
///
/// Records are unique per `(name, tenant_id)`. A record without a tenant is the
/// global default for its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Template name, e.g. `"clean_invoice"`.
    pub name: String,
    /// Owning tenant; `None` marks the global default.
    #[serde(default, alias = "companyId")]
    pub tenant_id: Option<TenantId>,
    /// Template text containing `{placeholder}` markers.
    #[serde(alias = "text")]
    pub body: String,
}

/// Exact-match filter for a template store lookup.
///
/// Only two shapes are ever issued: `(name, Some(tenant))` and `(name, None)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateFilter {
    /// Template name to match.
    pub name: String,
    /// Tenant to match; `None` matches only records without a tenant.
    pub tenant_id: Option<TenantId>,
}

impl TemplateFilter {
    /// Filter for the record of `name` owned by `tenant_id`.
    pub fn for_tenant(name: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            name: name.into(),
            tenant_id: Some(tenant_id),
        }
    }

    /// Filter for the global default record of `name`.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tenant_id: None,
        }
    }

    /// Returns `true` if `record` satisfies this filter exactly.
    pub fn matches(&self, record: &TemplateRecord) -> bool {
        record.name == self.name && record.tenant_id == self.tenant_id
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One logical request to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The user prompt.
    pub prompt: String,
    /// The system instruction framing the model's behaviour.
    pub system_instruction: String,
}

impl GenerationRequest {
    /// Creates a request from a prompt and a system instruction.
    pub fn new(prompt: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: system_instruction.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC instant used for cache freshness checks.
///
/// Only elapsed-time arithmetic is exposed; `chrono` stays an implementation
/// detail of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Time elapsed from `earlier` to `self`; zero if `earlier` is in the future.
    pub fn saturating_elapsed_since(self, earlier: Timestamp) -> Duration {
        (self.0 - earlier.0).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns this timestamp moved forward by `delta`.
    ///
    /// Saturates at the original value if the result is not representable.
    pub fn plus(self, delta: Duration) -> Self {
        chrono::Duration::from_std(delta)
            .ok()
            .and_then(|d| self.0.checked_add_signed(d))
            .map_or(self, Self)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    #[test]
    fn filter_matches_scope_exactly() {
        let global = TemplateRecord {
            name: "explain_generic".into(),
            tenant_id: None,
            body: "b".into(),
        };
        let scoped = TemplateRecord {
            tenant_id: Some(tenant("acme")),
            ..global.clone()
        };

        assert!(TemplateFilter::global("explain_generic").matches(&global));
        assert!(!TemplateFilter::global("explain_generic").matches(&scoped));
        assert!(TemplateFilter::for_tenant("explain_generic", tenant("acme")).matches(&scoped));
        assert!(!TemplateFilter::for_tenant("explain_generic", tenant("acme")).matches(&global));
        assert!(!TemplateFilter::for_tenant("other", tenant("acme")).matches(&scoped));
    }

    #[test]
    fn scope_display_distinguishes_global() {
        assert_eq!(TenantScope::from(None).to_string(), "global");
        assert_eq!(TenantScope::from(Some(tenant("acme"))).to_string(), "acme");
    }

    #[test]
    fn record_accepts_legacy_field_names() {
        let record: TemplateRecord =
            serde_json::from_str(r#"{"name":"chat","companyId":"acme","text":"hello"}"#).unwrap();
        assert_eq!(record.tenant_id, Some(tenant("acme")));
        assert_eq!(record.body, "hello");
    }

    #[test]
    fn elapsed_saturates_at_zero() {
        let t0 = Timestamp::now();
        let t1 = t0.plus(Duration::from_secs(5));
        assert_eq!(t1.saturating_elapsed_since(t0), Duration::from_secs(5));
        assert_eq!(t0.saturating_elapsed_since(t1), Duration::ZERO);
    }
}
