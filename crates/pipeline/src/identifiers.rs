//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`UserId`] with a [`TenantId`] even though both are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: token-claim-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies the authenticated caller (the `id` claim of a bearer token).
    UserId
}

string_id! {
    /// Identifies the tenant (company) a caller belongs to.
    ///
    /// Templates may be overridden per tenant; an absent tenant selects the
    /// global default. An empty string is never a valid tenant, so it can never
    /// be confused with the global scope.
    TenantId
}

// ---------------------------------------------------------------------------
// Identifiers: generated
// ---------------------------------------------------------------------------

string_id! {
    /// Correlates every log event emitted while serving one invocation.
    ///
    /// Supplied by the caller when it already has one (e.g. an inbound
    /// `X-Correlation-ID` header); otherwise generated with [`CorrelationId::generate`].
    CorrelationId
}

impl CorrelationId {
    /// Generates a fresh local correlation identifier of the form `ai-local-xxxxxxxx`.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("ai-local-{}", &simple[..8]))
    }
}
