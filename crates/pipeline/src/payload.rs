//! The open key/value payload threaded through a node.

use serde_json::{Map, Value};

use crate::Identity;

/// Key under which callers historically placed the caller identity.
///
/// The identity is carried as a typed field instead, so this key is removed on
/// the way in and can never appear on the way out.
pub const IDENTITY_KEY: &str = "user";

/// Decoded request fields plus the call-scoped caller identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
    identity: Option<Identity>,
}

impl Payload {
    /// Wraps decoded request fields. Any caller-supplied [`IDENTITY_KEY`] is dropped.
    pub fn new(mut fields: Map<String, Value>) -> Self {
        fields.remove(IDENTITY_KEY);
        Self {
            fields,
            identity: None,
        }
    }

    /// Attaches the authenticated caller.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The authenticated caller, if one was attached.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the string under `key` if it is present and non-empty.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Consumes the payload and returns only the data fields.
    ///
    /// The identity is discarded unconditionally.
    pub fn into_output(mut self) -> Map<String, Value> {
        self.fields.remove(IDENTITY_KEY);
        self.fields
    }
}
