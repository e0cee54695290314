//! Retrying LLM client — exponential backoff with cancellation.
//!
//! Only rate limits and server-side (5xx) failures are retried. Every other
//! error, and cancellation, propagates immediately. The cancellation token is
//! raced against both the provider call and the backoff sleep.

use quill_config::RetryConfig;
use quill_core::error::ProviderError;
use quill_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff schedule for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay after `error` on attempt `attempt`. A longer `Retry-After` wins.
    fn backoff(&self, attempt: u32, error: &ProviderError) -> Duration {
        let computed = self.delay_for(attempt);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                computed.max(Duration::from_secs(*retry_after_secs))
            }
            _ => computed,
        }
    }
}

/// The LLM client the loop controller owns.
///
/// Wraps a provider with the retry policy and reports attempts and total
/// duration through the response metadata.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a request, retrying per the policy until it succeeds, fails
    /// permanently, runs out of attempts, or `cancel` fires.
    pub async fn send(
        &self,
        request: ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, ProviderError> {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            debug!(
                provider = %self.provider.name(),
                model = %request.model,
                attempt,
                "Calling provider"
            );

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                result = self.provider.complete(request.clone()) => result,
            };

            let error = match result {
                Ok(mut response) => {
                    response.metadata.attempts = attempt;
                    response.metadata.duration_ms = started.elapsed().as_millis() as u64;
                    return Ok(response);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(attempt, error = %error, "Provider error is not retryable");
                return Err(error);
            }

            if attempt >= self.policy.max_attempts {
                warn!(
                    provider = %self.provider.name(),
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(error);
            }

            let delay = self.policy.backoff(attempt, &error);
            info!(
                provider = %self.provider.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after backoff"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
