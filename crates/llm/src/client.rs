//! Retrying generation client over a pluggable transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{GenerationRequest, RetryPolicy, ServiceError, TextGenerator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backoff::BackoffPolicy;
use crate::error::{GenerationError, GenerationResult};
use crate::framing;
use crate::transport::{GenerateBody, GenerationTransport, HttpTransport};

/// Default bound on a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Generation client with bounded retries.
///
/// Each call sends one logical request; connectivity failures, attempt
/// timeouts, and incomplete transfers are retried per the [`BackoffPolicy`].
/// Any other failure surfaces immediately.
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    model: String,
    policy: BackoffPolicy,
    attempt_timeout: Duration,
    cancel: CancellationToken,
}

impl GenerationClient {
    /// Creates a client over `transport` with the default policy and timeout.
    pub fn new(transport: Arc<dyn GenerationTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            policy: BackoffPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a client posting over HTTP to `base_url`.
    pub fn http(base_url: &str, model: impl Into<String>) -> GenerationResult<Self> {
        let transport = HttpTransport::new(base_url, DEFAULT_ATTEMPT_TIMEOUT)?;
        Ok(Self::new(Arc::new(transport), model))
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Stops in-flight attempts and back-off waits once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates text for `request`, retrying transient failures.
    pub async fn generate_text(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let body = GenerateBody::new(
            &self.model,
            &request.prompt,
            &request.system_instruction,
        );
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(&body).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!(attempt, "Generation succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            let after = match err.retry_policy() {
                RetryPolicy::Retryable { after } => after,
                RetryPolicy::NonRetryable => {
                    if err != GenerationError::Cancelled {
                        error!(attempt, error = %err, "Generation failed");
                    }
                    return Err(err);
                }
            };

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Generation retries exhausted");
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let scheduled = self.policy.delay_after(attempt);
            let delay = after.map_or(scheduled, |a| a.max(scheduled));
            warn!(
                attempt,
                max_attempts,
                ?delay,
                error = %err,
                "Generation attempt failed; retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, body: &GenerateBody) -> GenerationResult<String> {
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(GenerationError::Cancelled),
            sent = tokio::time::timeout(self.attempt_timeout, self.transport.send(body)) => sent,
        };
        let raw = match sent {
            Ok(result) => result?,
            Err(_) => {
                return Err(GenerationError::Unreachable {
                    reason: format!("attempt timed out after {:?}", self.attempt_timeout),
                })
            }
        };
        Ok(framing::final_text(&raw)?)
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("model", &self.model)
            .field("policy", &self.policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        self.generate_text(request).await.map_err(ServiceError::from)
    }
}
