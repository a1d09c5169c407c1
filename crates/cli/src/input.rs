//! Payload loading and decoding.

use std::path::Path;

use anyhow::Context;
use pipeline::ServiceError;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;

/// Reads the raw payload text from `path`, or from stdin when `path` is
/// absent or `-`. Decoding is left to [`parse_payload`] so the caller can
/// authenticate first.
pub async fn read_payload(path: Option<&Path>) -> anyhow::Result<String> {
    let text = match path {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read payload file {}", path.display()))?,
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read payload from stdin")?;
            text
        }
    };
    Ok(text)
}

/// Parses a YAML (or JSON) mapping. An empty document is an empty payload.
pub fn parse_payload(text: &str) -> Result<Map<String, Value>, ServiceError> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_yaml::from_str(text).map_err(|e| ServiceError::InvalidPayload {
        reason: e.to_string(),
    })?;
    into_fields(value)
}

/// Accepts an already-decoded payload value; `null` is an empty payload.
pub fn into_fields(value: Value) -> Result<Map<String, Value>, ServiceError> {
    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(Map::new()),
        other => Err(ServiceError::InvalidPayload {
            reason: format!("payload must be a mapping, found {}", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
