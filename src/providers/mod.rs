//! Text-generation provider adapters.
//!
//! Each backend implements [`Provider`] and fails with one of the
//! [`ProviderError`] kinds; the orchestrator treats those kinds uniformly
//! regardless of which backend produced them.

pub mod anthropic;
pub mod gemini;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// The closed set of backends, in fixed fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini (primary)
    Gemini,
    /// OpenAI (first fallback)
    OpenAi,
    /// Anthropic (second fallback)
    Anthropic,
    /// Canned responses, no I/O (last resort)
    Mock,
}

impl ProviderKind {
    /// Priority order the orchestrator walks on each request.
    pub const FALLBACK_ORDER: [ProviderKind; 4] = [
        Self::Gemini,
        Self::OpenAi,
        Self::Anthropic,
        Self::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable completion request passed down the provider chain.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Failure kinds a provider call can produce.
///
/// Only `Timeout` and `Connection` are retried; everything else falls
/// through to the next provider immediately.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("blocked by provider safety filter: {0}")]
    ContentBlocked(String),
}

impl ProviderError {
    /// Whether the per-provider retry loop may try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

/// One interchangeable text-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this adapter fronts.
    fn kind(&self) -> ProviderKind;

    /// Produce a completion for the request.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Map a reqwest transport error onto the failure taxonomy.
pub(crate) fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_connect() {
        ProviderError::Connection(err.to_string())
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Connection(err.to_string())
    }
}

/// Map a non-success HTTP status onto the failure taxonomy.
pub(crate) fn map_status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let detail = format!("{}: {}", status, body.chars().take(200).collect::<String>());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ProviderError::Auth(detail)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited(detail)
    } else if status.is_server_error() {
        ProviderError::Connection(detail)
    } else {
        ProviderError::MalformedResponse(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_order_starts_primary_ends_mock() {
        assert_eq!(ProviderKind::FALLBACK_ORDER[0], ProviderKind::Gemini);
        assert_eq!(ProviderKind::FALLBACK_ORDER[3], ProviderKind::Mock);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout.is_transient());
        assert!(ProviderError::Connection("refused".to_string()).is_transient());

        assert!(!ProviderError::Auth("bad key".to_string()).is_transient());
        assert!(!ProviderError::RateLimited("quota".to_string()).is_transient());
        assert!(!ProviderError::MalformedResponse("not json".to_string()).is_transient());
        assert!(!ProviderError::ContentBlocked("safety".to_string()).is_transient());
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, "no"),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ProviderError::Connection(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, "bad payload"),
            ProviderError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("hello")
            .with_system_prompt("be brief")
            .with_temperature(0.3)
            .with_max_tokens(50);

        assert_eq!(request.prompt, "hello");
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 50);
    }
}
