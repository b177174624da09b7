//! Canned-response provider.
//!
//! Registered last in the fallback order so a keyless install (or a total
//! outage of the real backends) still produces an answer.

use std::time::Duration;

use super::{GenerationRequest, Provider, ProviderError, ProviderKind};

/// Payload the mock returns for every prompt. The intent classifier finds
/// "search" in it and the filter extractor ignores the unknown fields, so
/// the pipeline degrades cleanly.
const MOCK_RESPONSE: &str = r#"{
  "intent": "search",
  "filters": {"price_range": "mid_range"},
  "response": "I can help you find mobile phones. Please provide more details."
}"#;

#[derive(Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn complete(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        // Simulated latency, mirrors a fast real call
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(MOCK_RESPONSE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_always_succeeds() {
        let provider = MockProvider::new();
        let reply = provider
            .complete(&GenerationRequest::new("anything"))
            .await
            .unwrap();

        assert!(reply.contains("search"));
        assert_eq!(provider.kind(), ProviderKind::Mock);
    }

    #[test]
    fn test_mock_payload_is_valid_json() {
        let value: serde_json::Value = serde_json::from_str(MOCK_RESPONSE).unwrap();
        assert_eq!(value["intent"], "search");
    }
}
