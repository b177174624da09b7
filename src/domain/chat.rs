//! Chat request/response surface.
//!
//! `ChatResponse` is the single shape every pipeline outcome maps to,
//! including safety deflections and internal-failure apologies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductCard;

/// Classified intent of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Find phones matching criteria (default when classification fails)
    Search,
    /// Compare specific phones
    Compare,
    /// Details about one phone
    Details,
    /// Explain a feature or term
    Explain,
    /// Ask for a recommendation
    Recommendation,
    /// Attempt to manipulate the assistant
    Adversarial,
    /// Not about mobile phones
    Irrelevant,
}

impl QueryIntent {
    /// Tag used in prompts and classifier output matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Compare => "compare",
            Self::Details => "details",
            Self::Explain => "explain",
            Self::Recommendation => "recommendation",
            Self::Adversarial => "adversarial",
            Self::Irrelevant => "irrelevant",
        }
    }

    /// All intents, in the order the classifier reply is matched against.
    pub const ALL: [QueryIntent; 7] = [
        Self::Search,
        Self::Compare,
        Self::Details,
        Self::Explain,
        Self::Recommendation,
        Self::Adversarial,
        Self::Irrelevant,
    ];
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            history: Vec::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Outbound chat response. Always well-formed, for every input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub intent: QueryIntent,

    #[serde(default)]
    pub products: Vec<ProductCard>,

    /// 0.0 - 1.0
    pub confidence: f32,
    #[serde(default)]
    pub suggestions: Vec<String>,

    pub is_safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_message: Option<String>,

    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    /// A normal answer with retrieved products.
    pub fn answer(
        message: String,
        intent: QueryIntent,
        products: Vec<ProductCard>,
        suggestions: Vec<String>,
        session_id: String,
    ) -> Self {
        Self {
            message,
            intent,
            products,
            confidence: 0.85,
            suggestions,
            is_safe: true,
            safety_message: None,
            session_id,
            timestamp: Utc::now(),
        }
    }

    /// Deflection for a query rejected by the safety gate.
    pub fn safety_deflection(message: String, reason: String, session_id: String) -> Self {
        Self {
            message,
            intent: QueryIntent::Adversarial,
            products: Vec::new(),
            confidence: 1.0,
            suggestions: Vec::new(),
            is_safe: false,
            safety_message: Some(reason),
            session_id,
            timestamp: Utc::now(),
        }
    }

    /// Deflection for queries classified adversarial or off-topic.
    pub fn off_topic(message: String, intent: QueryIntent, session_id: String) -> Self {
        Self {
            message,
            intent,
            products: Vec::new(),
            confidence: 0.9,
            suggestions: Vec::new(),
            is_safe: true,
            safety_message: None,
            session_id,
            timestamp: Utc::now(),
        }
    }

    /// Generic apology when the pipeline failed internally. Carries no
    /// provider names or error details.
    pub fn internal_failure(message: String, session_id: String) -> Self {
        Self {
            message,
            intent: QueryIntent::Search,
            products: Vec::new(),
            confidence: 0.0,
            suggestions: Vec::new(),
            is_safe: true,
            safety_message: None,
            session_id,
            timestamp: Utc::now(),
        }
    }
}
