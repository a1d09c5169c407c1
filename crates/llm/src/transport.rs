//! Transport seam and its reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{GenerationError, GenerationResult};

const GENERATE_PATH: &str = "/api/generate";

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Wire body of one generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateBody {
    pub model: String,
    pub prompt: String,
    pub system: String,
    pub stream: bool,
    pub format: String,
}

impl GenerateBody {
    /// A non-streaming request for JSON-formatted output.
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: system.into(),
            stream: false,
            format: "json".to_owned(),
        }
    }
}

/// Carries one attempt to the endpoint and returns the raw response body.
///
/// Implementations classify failures: connectivity problems are
/// [`GenerationError::Unreachable`], error statuses are
/// [`GenerationError::Status`]. They never retry.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn send(&self, body: &GenerateBody) -> GenerationResult<String>;
}

/// HTTP transport posting JSON to `<base_url>/api/generate`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Builds a transport whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> GenerationResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GenerationError::InvalidConfiguration {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            client,
            url: format!("{}{GENERATE_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// The full endpoint URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn classify(err: reqwest::Error) -> GenerationError {
    if err.is_builder() {
        GenerationError::InvalidConfiguration {
            reason: err.to_string(),
        }
    } else {
        GenerationError::Unreachable {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn send(&self, body: &GenerateBody) -> GenerationResult<String> {
        debug!(url = %self.url, model = %body.model, "Posting generate request");

        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Generation endpoint returned an error status");
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(text)
    }
}
