//! Node that explains structured data in plain language.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    template, GenerationRequest, Payload, ServiceError, TemplateCache, TextGenerator,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::node::{missing, Node};
use crate::registry::EXPLAIN_NODE;

const TEMPLATE: &str = "explain_generic";
const PLACEHOLDER: &str = "data_to_explain";
const SYSTEM_INSTRUCTION: &str = "You are a helpful financial assistant. Explain the following data clearly and concisely in plain English. Your output must be a single JSON object with a key 'explanation'.";
const NO_EXPLANATION: &str = "No explanation provided.";

/// Produces a plain-language explanation of structured data.
///
/// Best-effort: output that cannot be read as an explanation object is stored
/// as a diagnostic string under `explanation` instead of failing the call.
pub struct ExplainNode {
    templates: Arc<TemplateCache>,
    generator: Arc<dyn TextGenerator>,
}

impl ExplainNode {
    pub fn new(templates: Arc<TemplateCache>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            templates,
            generator,
        }
    }
}

fn explanation_from(output: &str) -> Value {
    match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(mut fields)) => fields
            .remove("explanation")
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::from(NO_EXPLANATION)),
        Ok(_) | Err(_) => {
            warn!(node = EXPLAIN_NODE, raw_output = %output, "Model output is not an explanation object");
            Value::from(format!("Error processing AI response: {output}"))
        }
    }
}

#[async_trait]
impl Node for ExplainNode {
    fn name(&self) -> &'static str {
        EXPLAIN_NODE
    }

    async fn process(&self, mut payload: Payload) -> Result<Payload, ServiceError> {
        let input = payload
            .get("input_data")
            .filter(|v| !v.is_null())
            .ok_or_else(|| missing(EXPLAIN_NODE, "input_data"))?;
        let data = serde_json::to_string_pretty(input).map_err(|e| ServiceError::Internal {
            message: format!("cannot serialise input_data: {e}"),
        })?;
        let tenant = payload
            .identity()
            .ok_or_else(|| missing(EXPLAIN_NODE, "identity"))?
            .tenant_id
            .clone();

        let body = self.templates.get_template(TEMPLATE, Some(&tenant)).await?;
        let prompt = template::render(&body, &[(PLACEHOLDER, data.as_str())]);

        let output = self
            .generator
            .generate(&GenerationRequest::new(prompt, SYSTEM_INSTRUCTION))
            .await?;

        payload.insert("explanation", explanation_from(&output));
        info!(node = EXPLAIN_NODE, "Generated explanation");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn explanation_field_is_extracted() {
        assert_eq!(
            explanation_from(r#"{"explanation": "Revenue rose."}"#),
            json!("Revenue rose.")
        );
    }

    #[test]
    fn object_without_explanation_uses_default() {
        assert_eq!(explanation_from(r#"{"summary": "x"}"#), json!(NO_EXPLANATION));
        assert_eq!(explanation_from(r#"{"explanation": null}"#), json!(NO_EXPLANATION));
    }

    #[test]
    fn unparseable_output_becomes_diagnostic() {
        assert_eq!(
            explanation_from("not json"),
            json!("Error processing AI response: not json")
        );
        assert_eq!(
            explanation_from("[1, 2]"),
            json!("Error processing AI response: [1, 2]")
        );
    }
}
