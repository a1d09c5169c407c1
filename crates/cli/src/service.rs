//! Wiring shared by `invoke` and `serve`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth::{CredentialVerifier, SigningSecret};
use llm::{CancellationToken, GenerationClient};
use nodes::{Dispatcher, NodeRegistry};
use pipeline::{CorrelationId, ServiceError, TemplateCache};
use serde_json::{Map, Value};
use store::YamlFileTemplateStore;
use tracing::info;

use crate::config::{PipelineSettings, SigningSettings};

pub fn verifier(settings: SigningSettings) -> anyhow::Result<CredentialVerifier> {
    let secret =
        SigningSecret::new(settings.signing_secret).context("signing secret must not be empty")?;
    Ok(CredentialVerifier::new(secret))
}

/// One dispatcher, one template cache and one verifier, built once and used
/// for every request the process handles.
pub struct Service {
    dispatcher: Dispatcher,
    credentials: CredentialVerifier,
    deadline: Duration,
}

impl Service {
    /// Opens the template file and builds the pipeline. Generation calls stop
    /// when `cancel` fires.
    pub async fn build(settings: PipelineSettings, cancel: CancellationToken) -> anyhow::Result<Self> {
        let ttl = settings.cache_ttl();
        let deadline = settings.generation.call_timeout();
        let credentials = verifier(settings.signing)?;

        let store = YamlFileTemplateStore::open(&settings.template_file)
            .await
            .with_context(|| {
                format!("failed to open templates at {}", settings.template_file.display())
            })?;
        let templates = Arc::new(TemplateCache::new(Arc::new(store), ttl));
        info!(ttl_secs = ttl.as_secs(), "Template cache ready");

        let generator = GenerationClient::http(
            &settings.generation.generation_url,
            settings.generation.generation_model,
        )
        .context("invalid generation client configuration")?
        .with_cancellation(cancel);

        Ok(Self {
            dispatcher: Dispatcher::new(NodeRegistry::new(templates, Arc::new(generator))),
            credentials,
            deadline,
        })
    }

    /// Outer deadline on one request.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Authenticates `token`, then decodes the payload, then runs `node`.
    ///
    /// `payload` is only called once the credential is accepted, so an
    /// anonymous caller always sees an auth error regardless of its body.
    pub async fn handle(
        &self,
        node: &str,
        token: Option<&str>,
        payload: impl FnOnce() -> Result<Map<String, Value>, ServiceError>,
        correlation_id: CorrelationId,
    ) -> Result<Map<String, Value>, ServiceError> {
        let identity = self.credentials.authenticate(token)?;
        let fields = payload()?;
        self.dispatcher
            .invoke_correlated(node, fields, identity, correlation_id)
            .await
    }
}
