//! Nodeflow credential verifier.
//!
//! Turns a bearer credential into a [`pipeline::Identity`] and checks
//! permissions against it. Tokens are HS256-signed JWTs carrying the caller's
//! `id`, `tenant_id`, `email`, optional `permissions`, and a mandatory `exp`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Token formats and signing details live here. The rest of
//! the workspace sees only [`pipeline::Identity`] and the `Auth*` variants of
//! [`pipeline::ServiceError`].

use std::collections::BTreeSet;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pipeline::{Identity, ServiceError, TenantId, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The only signing algorithm accepted or produced.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

const BEARER_SCHEME: &str = "Bearer";

// ---------------------------------------------------------------------------
// Signing secret
// ---------------------------------------------------------------------------

/// Pre-shared HMAC secret. Never printed.
#[derive(Clone)]
pub struct SigningSecret(SecretString);

impl SigningSecret {
    /// Wraps `secret`, returning `None` if it is empty.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(SecretString::from(secret)))
        }
    }

    fn bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Claims carried by a Nodeflow bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identifier.
    pub id: String,
    /// Tenant the caller acts for.
    #[serde(alias = "companyId")]
    pub tenant_id: String,
    /// Caller e-mail address.
    pub email: String,
    /// Granted permissions; absent means none.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issue time, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    fn into_identity(self) -> Result<Identity, ServiceError> {
        let id = UserId::new(self.id).ok_or_else(|| invalid("empty 'id' claim"))?;
        let tenant_id =
            TenantId::new(self.tenant_id).ok_or_else(|| invalid("empty 'tenant_id' claim"))?;
        Ok(Identity {
            id,
            tenant_id,
            email: self.email,
            permissions: self.permissions.into_iter().collect::<BTreeSet<_>>(),
        })
    }
}

fn invalid(reason: impl Into<String>) -> ServiceError {
    ServiceError::AuthInvalid {
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies bearer tokens signed with a pre-shared secret.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    secret: SigningSecret,
    leeway_secs: u64,
}

impl CredentialVerifier {
    /// Creates a verifier with zero clock-skew leeway.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            leeway_secs: 0,
        }
    }

    /// Tolerates `leeway` of clock skew when checking expiry.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_secs = leeway.as_secs();
        self
    }

    /// Decodes `raw_token` into the caller's identity.
    ///
    /// Accepts `"Bearer <token>"` or a bare token. Fails with
    /// [`ServiceError::AuthMissing`] when nothing was presented,
    /// [`ServiceError::AuthExpired`] when the token is past its expiry, and
    /// [`ServiceError::AuthInvalid`] for every other verification failure.
    pub fn authenticate(&self, raw_token: Option<&str>) -> Result<Identity, ServiceError> {
        let raw = raw_token.unwrap_or_default().trim();
        let token = match raw.strip_prefix(BEARER_SCHEME) {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
            _ => raw,
        };
        if token.is_empty() {
            warn!(code = "AUTH_MISSING", "Rejected request without credentials");
            return Err(ServiceError::AuthMissing);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = self.leeway_secs;

        let key = DecodingKey::from_secret(self.secret.bytes());
        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| {
                let err = match e.kind() {
                    ErrorKind::ExpiredSignature => ServiceError::AuthExpired,
                    _ => invalid(e.to_string()),
                };
                warn!(code = err.code(), "Rejected bearer token");
                err
            })?
            .claims;

        let identity = claims.into_identity()?;
        debug!(user = %identity.id, tenant = %identity.tenant_id, "Authenticated caller");
        Ok(identity)
    }

    /// Signs a token for `identity` that expires after `ttl`.
    ///
    /// Intended for development tooling and tests; production tokens are
    /// minted by the identity service that shares the secret.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, ServiceError> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            id: identity.id.to_string(),
            tenant_id: identity.tenant_id.to_string(),
            email: identity.email.clone(),
            permissions: identity.permissions.iter().cloned().collect(),
            exp: now.saturating_add(ttl_secs),
            iat: Some(now),
        };
        encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.bytes()),
        )
        .map_err(|e| ServiceError::Internal {
            message: format!("Failed to sign token: {e}"),
        })
    }
}

/// Checks that `identity` holds `required_permission`.
///
/// Denial is [`ServiceError::AuthForbidden`]; it is never ignored.
pub fn authorize<'a>(
    identity: &'a Identity,
    required_permission: &str,
) -> Result<&'a Identity, ServiceError> {
    if identity.has_permission(required_permission) {
        Ok(identity)
    } else {
        warn!(
            user = %identity.id,
            permission = required_permission,
            "Permission denied"
        );
        Err(ServiceError::AuthForbidden {
            permission: required_permission.to_owned(),
        })
    }
}
