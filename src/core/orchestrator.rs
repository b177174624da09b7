//! Multi-provider generation orchestrator.
//!
//! Walks the provider list in priority order, skipping providers whose
//! circuit breaker rejects attempts, retrying transient failures with
//! bounded backoff, and falling through to the next provider on any
//! failure. The loop is a sequential await chain: first success wins, and
//! dropping the future cancels the in-flight call along with the rest of
//! the chain.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, instrument, warn};

use crate::domain::{ChatMessage, QueryIntent, SearchFilters};
use crate::providers::{GenerationRequest, Provider, ProviderError};

use super::breaker::BreakerMap;
use super::prompts;
use super::retry::RetryPolicy;

/// Raised only when every provider was skipped or failed.
///
/// The message is for logs; the pipeline converts it into a generic
/// user-facing apology that names no provider.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    #[error("all providers failed or were skipped; last error: {last}")]
    Exhausted { last: String },
}

/// Orchestrates completion calls across the configured providers.
pub struct Orchestrator {
    /// Providers in fallback priority order.
    providers: Vec<Box<dyn Provider>>,
    breakers: Arc<BreakerMap>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        providers: Vec<Box<dyn Provider>>,
        breakers: Arc<BreakerMap>,
        retry: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            breakers,
            retry,
            call_timeout,
        }
    }

    /// Produce a completion, trying providers in priority order.
    #[instrument(skip(self, request))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, OrchestratorError> {
        let mut last_error: Option<ProviderError> = None;

        for provider in &self.providers {
            let kind = provider.kind();

            // Read-then-transition must stay inside the breaker lock
            let admitted = self
                .breakers
                .with(kind, |breaker| breaker.can_attempt())
                .unwrap_or(true);

            if !admitted {
                warn!(provider = %kind, "circuit breaker open, skipping provider");
                continue;
            }

            match self.call_with_retry(provider.as_ref(), request).await {
                Ok(text) => {
                    self.breakers.with(kind, |breaker| breaker.record_success());
                    debug!(provider = %kind, "generation succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    self.breakers.with(kind, |breaker| breaker.record_failure());
                    error!(provider = %kind, error = %e, "provider failed, falling through");
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no provider available".to_string());
        error!(%last, "all providers exhausted");
        Err(OrchestratorError::Exhausted { last })
    }

    /// One provider's bounded attempt loop. Only transient failures
    /// (timeout, connection) are retried; everything else fails fast so
    /// the fallback loop can move on.
    async fn call_with_retry(
        &self,
        provider: &dyn Provider,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let result = match timeout(self.call_timeout, provider.complete(request)).await {
                Ok(inner) => inner,
                Err(_) => Err(ProviderError::Timeout),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        provider = %provider.kind(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Classify a query into one of the fixed intents.
    ///
    /// Never fails: an unmatched or erroring reply defaults to `Search`.
    pub async fn classify_intent(&self, query: &str) -> QueryIntent {
        let request = GenerationRequest::new(format!("Query: {query}\n\nIntent:"))
            .with_system_prompt(prompts::INTENT_CLASSIFICATION)
            .with_temperature(0.3)
            .with_max_tokens(50);

        match self.generate(&request).await {
            Ok(reply) => {
                let reply_lower = reply.trim().to_lowercase();

                for intent in QueryIntent::ALL {
                    if reply_lower.contains(intent.as_str()) {
                        return intent;
                    }
                }

                warn!(
                    event = "intent_default_fallback",
                    "classifier reply matched no intent tag"
                );
                QueryIntent::Search
            }
            Err(e) => {
                warn!(
                    event = "intent_default_fallback",
                    error = %e,
                    "intent classification failed"
                );
                QueryIntent::Search
            }
        }
    }

    /// Extract structured search filters from a query.
    ///
    /// Never fails: a malformed reply yields the all-absent filter object.
    pub async fn extract_filters(&self, query: &str) -> SearchFilters {
        let request = GenerationRequest::new(format!("Query: {query}\n\nExtracted filters:"))
            .with_system_prompt(prompts::FILTER_EXTRACTION)
            .with_temperature(0.3)
            .with_max_tokens(500);

        let reply = match self.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    event = "filter_parse_fallback",
                    error = %e,
                    "filter extraction failed"
                );
                return SearchFilters::default();
            }
        };

        let cleaned = strip_code_fences(&reply);

        match serde_json::from_str(&cleaned) {
            Ok(filters) => filters,
            Err(e) => {
                warn!(
                    event = "filter_parse_fallback",
                    error = %e,
                    "filter reply was not valid filter JSON"
                );
                SearchFilters::default()
            }
        }
    }

    /// Generate the final natural-language reply from the query, the
    /// retrieved-product context block, and recent conversation history.
    pub async fn generate_reply(
        &self,
        query: &str,
        context: &str,
        history: &[ChatMessage],
    ) -> Result<String, OrchestratorError> {
        let history_text = history
            .iter()
            .rev()
            .take(5)
            .rev()
            .map(|msg| format!("{}: {}", msg.role, msg.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Conversation History:\n{history_text}\n\n\
             Context (Available Phones):\n{context}\n\n\
             User Query: {query}\n\nResponse:"
        );

        let request = GenerationRequest::new(prompt)
            .with_system_prompt(prompts::RESPONSE_GENERATION)
            .with_temperature(0.7)
            .with_max_tokens(1024);

        self.generate(&request).await
    }
}

/// Strip markdown code-fence wrapping from an LLM JSON reply.
fn strip_code_fences(reply: &str) -> String {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut sections = trimmed.split("```");
    sections.next(); // text before the opening fence
    let inner = sections.next().unwrap_or("");
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim().to_string()
}
