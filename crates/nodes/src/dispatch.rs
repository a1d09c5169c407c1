//! Authorization and invocation of a named node.

use auth::authorize;
use pipeline::{CorrelationId, Identity, Payload, ServiceError};
use serde_json::{Map, Value};
use tracing::{info_span, Instrument};

use crate::node::execute;
use crate::registry::NodeRegistry;

/// Entry point for one node invocation by an authenticated caller.
#[derive(Debug)]
pub struct Dispatcher {
    registry: NodeRegistry,
}

impl Dispatcher {
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Runs `node_name` over `fields` under a freshly generated correlation id.
    pub async fn invoke(
        &self,
        node_name: &str,
        fields: Map<String, Value>,
        identity: Identity,
    ) -> Result<Map<String, Value>, ServiceError> {
        self.invoke_correlated(node_name, fields, identity, CorrelationId::generate())
            .await
    }

    /// Runs `node_name` over `fields` and returns the resulting fields.
    ///
    /// Any identity-shaped key the caller put in `fields` is dropped on entry
    /// and the attached identity never appears in the output.
    pub async fn invoke_correlated(
        &self,
        node_name: &str,
        fields: Map<String, Value>,
        identity: Identity,
        correlation_id: CorrelationId,
    ) -> Result<Map<String, Value>, ServiceError> {
        let span = info_span!(
            "invoke",
            node = node_name,
            correlation_id = %correlation_id,
            tenant = %identity.tenant_id,
        );

        async move {
            let node = self.registry.resolve(node_name)?;
            if let Some(permission) = node.required_permission() {
                authorize(&identity, permission)?;
            }
            let payload = Payload::new(fields).with_identity(identity);
            let payload = execute(node.as_ref(), payload).await?;
            Ok(payload.into_output())
        }
        .instrument(span)
        .await
    }
}
