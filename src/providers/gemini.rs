//! Google Gemini adapter (primary provider).
//!
//! Calls the `generateContent` REST endpoint. Gemini has no separate
//! system role, so the system prompt is prepended to the user prompt.

use serde::{Deserialize, Serialize};

use super::{
    map_status_error, map_transport_error, GenerationRequest, Provider, ProviderError,
    ProviderKind,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            model,
            client,
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        )
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let full_prompt = match &request.system_prompt {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let payload = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: full_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.api_url())
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no candidates".to_string()))?;

        // SAFETY/RECITATION finishes carry no usable text
        if let Some(reason) = &candidate.finish_reason {
            if reason == "SAFETY" || reason == "RECITATION" {
                return Err(ProviderError::ContentBlocked(reason.clone()));
            }
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "candidate contained no text parts".to_string(),
            ));
        }

        Ok(text)
    }
}
