//! The `Node` trait and the logged execution wrapper.

use async_trait::async_trait;
use pipeline::{Payload, ServiceError};
use tracing::{error, info};

/// A named unit of payload transformation.
#[async_trait]
pub trait Node: Send + Sync {
    /// Registry name of this node.
    fn name(&self) -> &'static str;

    /// Permission a caller must hold to run this node, if any.
    fn required_permission(&self) -> Option<&'static str> {
        None
    }

    /// Transforms `payload`. Failures are returned, never swallowed.
    async fn process(&self, payload: Payload) -> Result<Payload, ServiceError>;
}

/// Runs `node` with start/success/failure logging.
///
/// The node's error is returned unchanged.
pub async fn execute(node: &dyn Node, payload: Payload) -> Result<Payload, ServiceError> {
    let name = node.name();
    info!(node = name, "Executing node");
    match node.process(payload).await {
        Ok(payload) => {
            info!(node = name, "Node execution successful");
            Ok(payload)
        }
        Err(err) => {
            error!(node = name, code = err.code(), error = %err, "Error during node execution");
            Err(err)
        }
    }
}

pub(crate) fn missing(node: &str, field: &str) -> ServiceError {
    ServiceError::MissingInput {
        node: node.to_owned(),
        field: field.to_owned(),
    }
}
