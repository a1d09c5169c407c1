//! End-to-end tests for the dispatcher and built-in nodes.
//!
//! The template store is the in-memory store; the generator is a stub that
//! replays a fixed reply and records every request it receives.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodes::*;
use pipeline::*;
use serde_json::{json, Map, Value};
use store::MemoryTemplateStore;

// ============================================================================
// Fakes
// ============================================================================

struct StubGenerator {
    reply: Result<String, ServiceError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_owned()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: ServiceError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

fn record(name: &str, tenant: Option<&str>, body: &str) -> TemplateRecord {
    TemplateRecord {
        name: name.to_owned(),
        tenant_id: tenant.map(|t| TenantId::new(t).unwrap()),
        body: body.to_owned(),
    }
}

fn default_templates() -> Vec<TemplateRecord> {
    vec![
        record("clean_invoice", None, "Extract: {invoice_data}"),
        record("explain_generic", None, "Explain this:\n{data_to_explain}"),
    ]
}

fn dispatcher_with(templates: Vec<TemplateRecord>, generator: Arc<StubGenerator>) -> Dispatcher {
    let store = Arc::new(MemoryTemplateStore::from_records(templates).unwrap());
    let cache = Arc::new(TemplateCache::new(store, Duration::from_secs(60)));
    Dispatcher::new(NodeRegistry::new(cache, generator))
}

fn caller() -> Identity {
    Identity {
        id: UserId::new("u-42").unwrap(),
        tenant_id: TenantId::new("acme").unwrap(),
        email: "ops@acme.test".to_owned(),
        permissions: BTreeSet::new(),
    }
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_lists_built_in_nodes() {
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(default_templates(), generator);

    assert_eq!(dispatcher.registry().names(), BUILT_IN_NODES.to_vec());
}

#[tokio::test]
async fn unknown_node_is_not_found() {
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(default_templates(), generator.clone());

    let err = dispatcher
        .invoke("summarise", fields(json!({"raw_text": "x"})), caller())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::NodeNotFound {
            name: "summarise".to_owned()
        }
    );
    assert_eq!(err.status(), 404);
    assert!(generator.requests().is_empty());
}

// ============================================================================
// clean_yaml
// ============================================================================

#[tokio::test]
async fn clean_node_renders_template_and_parses_output() {
    let generator = StubGenerator::replying(r#"{"total": 100}"#);
    let dispatcher = dispatcher_with(default_templates(), generator.clone());

    let out = dispatcher
        .invoke(CLEAN_NODE, fields(json!({"raw_text": "Invoice #123"})), caller())
        .await
        .unwrap();

    assert_eq!(out.get("cleaned_data"), Some(&json!({"total": 100})));
    assert_eq!(out.get("raw_text"), Some(&json!("Invoice #123")));

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Extract: Invoice #123");
    assert!(requests[0].system_instruction.contains("valid JSON"));
}

#[tokio::test]
async fn clean_node_prefers_tenant_template() {
    let mut templates = default_templates();
    templates.push(record("clean_invoice", Some("acme"), "ACME extract: {invoice_data}"));
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(templates, generator.clone());

    dispatcher
        .invoke(CLEAN_NODE, fields(json!({"raw_text": "Invoice #9"})), caller())
        .await
        .unwrap();

    assert_eq!(generator.requests()[0].prompt, "ACME extract: Invoice #9");
}

#[tokio::test]
async fn clean_node_rejects_non_json_output() {
    let generator = StubGenerator::replying("Sure! The total is 100.");
    let dispatcher = dispatcher_with(default_templates(), generator);

    let err = dispatcher
        .invoke(CLEAN_NODE, fields(json!({"raw_text": "Invoice #123"})), caller())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::MalformedGenerationOutput {
            raw_output: "Sure! The total is 100.".to_owned()
        }
    );
}

#[tokio::test]
async fn clean_node_requires_raw_text() {
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(default_templates(), generator.clone());

    for input in [json!({}), json!({"raw_text": ""}), json!({"raw_text": 7})] {
        let err = dispatcher
            .invoke(CLEAN_NODE, fields(input), caller())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::MissingInput {
                node: CLEAN_NODE.to_owned(),
                field: "raw_text".to_owned()
            }
        );
    }
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn missing_template_fails_before_generation() {
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(Vec::new(), generator.clone());

    let err = dispatcher
        .invoke(CLEAN_NODE, fields(json!({"raw_text": "Invoice #1"})), caller())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::TemplateMissing {
            name: "clean_invoice".to_owned()
        }
    );
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn generator_failure_propagates() {
    let generator = StubGenerator::failing(ServiceError::GenerationUnavailable { attempts: 5 });
    let dispatcher = dispatcher_with(default_templates(), generator);

    let err = dispatcher
        .invoke(CLEAN_NODE, fields(json!({"raw_text": "Invoice #1"})), caller())
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::GenerationUnavailable { attempts: 5 });
    assert_eq!(err.status(), 503);
}

// ============================================================================
// explain
// ============================================================================

#[tokio::test]
async fn explain_node_stores_explanation() {
    let generator = StubGenerator::replying(r#"{"explanation": "Revenue doubled."}"#);
    let dispatcher = dispatcher_with(default_templates(), generator.clone());

    let out = dispatcher
        .invoke(
            EXPLAIN_NODE,
            fields(json!({"input_data": {"revenue": [1, 2]}})),
            caller(),
        )
        .await
        .unwrap();

    assert_eq!(out.get("explanation"), Some(&json!("Revenue doubled.")));
    let prompt = &generator.requests()[0].prompt;
    assert!(prompt.starts_with("Explain this:\n{"), "{prompt}");
    assert!(prompt.contains("\"revenue\""), "{prompt}");
}

#[tokio::test]
async fn explain_node_tolerates_unparseable_output() {
    let generator = StubGenerator::replying("not json");
    let dispatcher = dispatcher_with(default_templates(), generator);

    let out = dispatcher
        .invoke(EXPLAIN_NODE, fields(json!({"input_data": [1, 2, 3]})), caller())
        .await
        .unwrap();

    let explanation = out.get("explanation").and_then(Value::as_str).unwrap();
    assert!(explanation.contains("not json"), "{explanation}");
}

#[tokio::test]
async fn explain_node_requires_input_data() {
    let generator = StubGenerator::replying("{}");
    let dispatcher = dispatcher_with(default_templates(), generator);

    let err = dispatcher
        .invoke(EXPLAIN_NODE, fields(json!({"input_data": null})), caller())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "NODE_EXECUTION_ERROR");
    assert_eq!(err.status(), 400);
}

// ============================================================================
// chat
// ============================================================================

#[tokio::test]
async fn chat_node_returns_trimmed_reply() {
    let generator = StubGenerator::replying("  Hello there\n");
    // Chat needs no templates.
    let dispatcher = dispatcher_with(Vec::new(), generator.clone());

    let out = dispatcher
        .invoke(
            CHAT_NODE,
            fields(json!({"message": "hi", "history": [{"role": "user", "content": "earlier"}]})),
            caller(),
        )
        .await
        .unwrap();

    assert_eq!(out.get("response"), Some(&json!("Hello there")));
    let requests = generator.requests();
    assert_eq!(requests[0].prompt, "hi");
    assert_eq!(requests[0].system_instruction, "You are a helpful assistant.");
}

#[tokio::test]
async fn chat_node_requires_message() {
    let generator = StubGenerator::replying("Hello");
    let dispatcher = dispatcher_with(Vec::new(), generator);

    let err = dispatcher
        .invoke(CHAT_NODE, fields(json!({"history": []})), caller())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::MissingInput {
            node: CHAT_NODE.to_owned(),
            field: "message".to_owned()
        }
    );
}

// ============================================================================
// Identity scrubbing
// ============================================================================

#[tokio::test]
async fn identity_never_appears_in_output() {
    let generator = StubGenerator::replying("Hello");
    let dispatcher = dispatcher_with(Vec::new(), generator);

    let out = dispatcher
        .invoke(
            CHAT_NODE,
            fields(json!({"message": "hi", IDENTITY_KEY: {"id": "spoofed"}})),
            caller(),
        )
        .await
        .unwrap();

    assert!(!out.contains_key(IDENTITY_KEY));
    let rendered = serde_json::to_string(&out).unwrap();
    assert!(!rendered.contains("u-42"), "{rendered}");
    assert!(!rendered.contains("ops@acme.test"), "{rendered}");
    assert!(!rendered.contains("spoofed"), "{rendered}");
}

#[tokio::test]
async fn explicit_correlation_id_is_accepted() {
    let generator = StubGenerator::replying("Hello");
    let dispatcher = dispatcher_with(Vec::new(), generator);

    let out = dispatcher
        .invoke_correlated(
            CHAT_NODE,
            fields(json!({"message": "hi"})),
            caller(),
            CorrelationId::new("ai-local-deadbeef").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(out.get("response"), Some(&json!("Hello")));
}
