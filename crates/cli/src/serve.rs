//! `nodeflow serve`: many invocations over one process.
//!
//! Each stdin line is one request document:
//!
//! ```json
//! {"node": "clean_yaml", "token": "Bearer ...", "payload": {"raw_text": "..."}, "correlation_id": "req-1"}
//! ```
//!
//! Each stdout line is the matching response: the invocation envelope plus
//! `correlationId`. Requests run concurrently, so responses can arrive out of
//! order; match them on `correlationId`. All requests share one template
//! cache, so a template read for one caller is served from memory to the next.

use std::sync::Arc;

use anyhow::Context;
use llm::CancellationToken;
use pipeline::{CorrelationId, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::input;
use crate::service::Service;

/// One line of input.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub node: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// One line of output.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(flatten)]
    pub envelope: Envelope,
}

/// Reads requests until stdin closes or `cancel` fires, then waits for the
/// requests already accepted to finish.
pub async fn run(
    service: Arc<Service>,
    max_in_flight: u32,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let limit = max_in_flight as usize;
    let permits = Arc::new(Semaphore::new(limit));
    let (responses, mut outbox) = mpsc::channel::<Response>(limit);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = outbox.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    info!(max_in_flight, "Serving requests from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0u64;
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Interrupted; no longer reading requests");
                break;
            }
            line = lines.next_line() => line.context("failed to read request from stdin")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .context("request limiter closed")?;
        accepted += 1;
        let service = service.clone();
        let responses = responses.clone();
        tokio::spawn(async move {
            let response = handle_line(&service, &line).await;
            if responses.send(response).await.is_err() {
                warn!("Response writer stopped; dropping response");
            }
            drop(permit);
        });
    }

    // Every permit back means every accepted request has sent its response.
    let _all = permits
        .acquire_many(max_in_flight)
        .await
        .context("request limiter closed")?;
    drop(responses);
    writer.await.context("response writer panicked")??;
    info!(requests = accepted, "Input closed; served all requests");
    Ok(())
}

/// Decodes one request line and runs it under the per-request deadline.
pub async fn handle_line(service: &Service, line: &str) -> Response {
    let request: Request = match serde_yaml::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            let err = ServiceError::InvalidPayload {
                reason: e.to_string(),
            };
            return respond(CorrelationId::generate(), Err(err));
        }
    };

    let correlation_id = request
        .correlation_id
        .and_then(CorrelationId::new)
        .unwrap_or_else(CorrelationId::generate);
    debug!(node = %request.node, correlation_id = %correlation_id, "Accepted request");

    let payload = request.payload;
    let outcome = tokio::time::timeout(
        service.deadline(),
        service.handle(
            &request.node,
            request.token.as_deref(),
            move || input::into_fields(payload),
            correlation_id.clone(),
        ),
    )
    .await
    .unwrap_or_else(|_| {
        warn!(
            correlation_id = %correlation_id,
            deadline_secs = service.deadline().as_secs(),
            "Request deadline expired"
        );
        Err(ServiceError::Cancelled)
    });

    respond(correlation_id, outcome)
}

fn respond(
    correlation_id: CorrelationId,
    outcome: Result<serde_json::Map<String, Value>, ServiceError>,
) -> Response {
    let envelope = match outcome {
        Ok(data) => Envelope::success(data),
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                code = err.code(),
                status = err.status(),
                "Request failed"
            );
            Envelope::error(&err)
        }
    };
    Response {
        correlation_id: correlation_id.to_string(),
        envelope,
    }
}
