//! Single-turn conversational node.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{GenerationRequest, Payload, ServiceError, TextGenerator};
use serde_json::Value;
use tracing::debug;

use crate::node::{missing, Node};
use crate::registry::CHAT_NODE;

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

/// Free-form chat turn. Uses no template and never touches the store.
pub struct ChatNode {
    generator: Arc<dyn TextGenerator>,
}

impl ChatNode {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

/// The `response` string of a JSON object, or the raw text otherwise.
fn reply_from(output: &str) -> String {
    let reply = match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(mut fields)) => match fields.remove("response") {
            Some(Value::String(text)) => text,
            _ => output.to_owned(),
        },
        _ => output.to_owned(),
    };
    reply.trim().to_owned()
}

#[async_trait]
impl Node for ChatNode {
    fn name(&self) -> &'static str {
        CHAT_NODE
    }

    async fn process(&self, mut payload: Payload) -> Result<Payload, ServiceError> {
        let message = payload
            .non_empty_str("message")
            .ok_or_else(|| missing(CHAT_NODE, "message"))?
            .to_owned();
        if let Some(history) = payload.get("history").and_then(Value::as_array) {
            debug!(node = CHAT_NODE, turns = history.len(), "Prior history supplied");
        }

        let output = self
            .generator
            .generate(&GenerationRequest::new(message, SYSTEM_INSTRUCTION))
            .await?;

        payload.insert("response", reply_from(&output));
        Ok(payload)
    }
}
