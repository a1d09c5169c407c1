//! Node that extracts structured data from raw text.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    template, GenerationRequest, Payload, ServiceError, TemplateCache, TextGenerator,
};
use serde_json::Value;
use tracing::{error, info};

use crate::node::{missing, Node};
use crate::registry::CLEAN_NODE;

const TEMPLATE: &str = "clean_invoice";
const PLACEHOLDER: &str = "invoice_data";
const SYSTEM_INSTRUCTION: &str = "You are a data extraction assistant. Your only output should be valid JSON as requested in the user prompt.";

/// Turns messy text (e.g. OCR output) into structured data.
///
/// Reads `raw_text`, writes the parsed JSON to `cleaned_data`. Output that is
/// not JSON fails the call; there is no partial result.
pub struct CleanInvoiceNode {
    templates: Arc<TemplateCache>,
    generator: Arc<dyn TextGenerator>,
}

impl CleanInvoiceNode {
    pub fn new(templates: Arc<TemplateCache>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            templates,
            generator,
        }
    }
}

#[async_trait]
impl Node for CleanInvoiceNode {
    fn name(&self) -> &'static str {
        CLEAN_NODE
    }

    async fn process(&self, mut payload: Payload) -> Result<Payload, ServiceError> {
        let raw_text = payload
            .non_empty_str("raw_text")
            .ok_or_else(|| missing(CLEAN_NODE, "raw_text"))?
            .to_owned();
        let tenant = payload
            .identity()
            .ok_or_else(|| missing(CLEAN_NODE, "identity"))?
            .tenant_id
            .clone();

        let body = self.templates.get_template(TEMPLATE, Some(&tenant)).await?;
        let prompt = template::render(&body, &[(PLACEHOLDER, raw_text.as_str())]);

        let output = self
            .generator
            .generate(&GenerationRequest::new(prompt, SYSTEM_INSTRUCTION))
            .await?;

        let cleaned: Value = serde_json::from_str(&output).map_err(|e| {
            error!(node = CLEAN_NODE, error = %e, raw_output = %output, "Failed to parse JSON from model output");
            ServiceError::MalformedGenerationOutput {
                raw_output: output.clone(),
            }
        })?;

        info!(node = CLEAN_NODE, "Parsed cleaned data from model output");
        payload.insert("cleaned_data", cleaned);
        Ok(payload)
    }
}
