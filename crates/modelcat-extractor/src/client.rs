//! Extraction client with the call/retry state machine

use crate::config::ClientConfig;
use crate::context_cache::ReusableContextCache;
use crate::error::ExtractorError;
use modelcat_domain::traits::ExtractionBackend;
use modelcat_domain::{
    ErrorCategory, ExtractionFailure, ExtractionOutcome, ExtractionRequest, ExtractionSuccess,
    UpstreamError, UpstreamResponse,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// State of one extraction call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Not started
    Idle,

    /// Attempt `n` (1-based) in flight
    Attempting(u32),

    /// An attempt returned a field map
    Succeeded,

    /// Failed permanently or ran out of attempts
    Exhausted,
}

impl CallState {
    /// Start the first attempt
    pub fn begin(self) -> Self {
        match self {
            CallState::Idle => CallState::Attempting(1),
            other => other,
        }
    }

    /// Transition after a successful attempt
    pub fn succeed(self) -> Self {
        match self {
            CallState::Attempting(_) => CallState::Succeeded,
            other => other,
        }
    }

    /// Transition after a failed attempt
    ///
    /// A retryable failure with attempts left moves to the next attempt;
    /// anything else is terminal.
    pub fn fail(self, retryable: bool, max_attempts: u32) -> Self {
        match self {
            CallState::Attempting(n) if retryable && n < max_attempts => CallState::Attempting(n + 1),
            CallState::Attempting(_) => CallState::Exhausted,
            other => other,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Succeeded | CallState::Exhausted)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Idle => f.write_str("idle"),
            CallState::Attempting(n) => write!(f, "attempting({})", n),
            CallState::Succeeded => f.write_str("succeeded"),
            CallState::Exhausted => f.write_str("exhausted"),
        }
    }
}

/// Sends assembled requests upstream and retries transient failures
///
/// Never returns an error: every call ends in an [`ExtractionOutcome`].
pub struct ExtractionClient<B: ExtractionBackend> {
    backend: Arc<B>,
    cache: Arc<ReusableContextCache>,
    config: ClientConfig,
}

impl<B: ExtractionBackend> ExtractionClient<B> {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `ExtractorError::Config` if the configuration is invalid.
    pub fn new(
        backend: Arc<B>,
        cache: Arc<ReusableContextCache>,
        config: ClientConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            backend,
            cache,
            config,
        })
    }

    /// The upstream backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The shared context cache
    pub fn cache(&self) -> &ReusableContextCache {
        &self.cache
    }

    /// Current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one extraction call to completion
    pub async fn extract(&self, request: &ExtractionRequest) -> ExtractionOutcome {
        let mut state = CallState::Idle.begin();
        let mut attempt = 1;
        let mut delays = Vec::new();

        loop {
            match self.attempt(request).await {
                Ok((response, sent_at)) => {
                    state = state.succeed();
                    self.cache.mark_used_at(request.segments(), sent_at);
                    let tokens_used = response.usage.total();
                    info!(
                        "Extraction {} for {} after {} attempt(s), {} tokens ({} cached)",
                        state,
                        request.kind(),
                        attempt,
                        tokens_used,
                        response.usage.cache_read_input_tokens
                    );
                    return ExtractionOutcome::Success(ExtractionSuccess {
                        fields: response.fields,
                        tokens_used,
                        model: response.model,
                        usage: response.usage,
                        attempts: attempt,
                        delays,
                    });
                }
                Err(err) => {
                    state = state.fail(err.is_retryable(), self.config.max_attempts);
                    let CallState::Attempting(next) = state else {
                        warn!(
                            "Extraction {} for {} after {} attempt(s): {}",
                            state,
                            request.kind(),
                            attempt,
                            err
                        );
                        return ExtractionOutcome::Failure(ExtractionFailure {
                            kind: err.category,
                            retryable: err.is_retryable(),
                            message: err.message,
                            attempts: attempt,
                            delays,
                        });
                    };

                    let delay = self.config.backoff(attempt);
                    warn!(
                        "Upstream error (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.config.max_attempts, err, delay
                    );
                    delays.push(delay);
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
            }
        }
    }

    /// One attempt under the per-attempt timeout
    ///
    /// On success also returns when the request was sent. The upstream reuse
    /// window starts at send time, not when the response arrives.
    async fn attempt(
        &self,
        request: &ExtractionRequest,
    ) -> Result<(UpstreamResponse, Instant), UpstreamError> {
        let resolution = self.cache.resolve(request.segments());
        let call = request.to_call(|hash| resolution.is_registered(hash));
        debug!(
            "Calling {} with tool {} ({} fresh, {} reused segments)",
            self.backend.model_name(),
            call.tool_name,
            resolution.fresh.len(),
            resolution.registered.len()
        );

        let limit = self.config.attempt_timeout();
        let sent_at = Instant::now();
        match timeout(limit, self.backend.extract(&call)).await {
            Ok(result) => result.map(|response| (response, sent_at)),
            Err(_) => Err(UpstreamError::new(
                ErrorCategory::Timeout,
                format!("attempt exceeded {:?}", limit),
            )),
        }
    }
}

impl<B: ExtractionBackend> Clone for ExtractionClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_retryable_advances() {
        let state = CallState::Idle.begin();
        assert_eq!(state, CallState::Attempting(1));
        assert_eq!(state.fail(true, 3), CallState::Attempting(2));
    }

    #[test]
    fn test_state_last_attempt_exhausts() {
        assert_eq!(CallState::Attempting(3).fail(true, 3), CallState::Exhausted);
    }

    #[test]
    fn test_state_permanent_failure_exhausts() {
        assert_eq!(CallState::Attempting(1).fail(false, 3), CallState::Exhausted);
    }

    #[test]
    fn test_state_success() {
        let state = CallState::Attempting(2).succeed();
        assert_eq!(state, CallState::Succeeded);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert_eq!(CallState::Succeeded.fail(true, 3), CallState::Succeeded);
        assert_eq!(CallState::Exhausted.succeed(), CallState::Exhausted);
        assert_eq!(CallState::Exhausted.begin(), CallState::Exhausted);
    }
}
