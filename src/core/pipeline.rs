//! Chat pipeline coordinator.
//!
//! Sequences safety gate -> intent classification -> filter extraction ->
//! retrieval -> response generation, and maps every failure mode onto a
//! well-formed `ChatResponse`. `handle_chat` never returns an error.

use std::sync::Arc;

use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::catalog::{CatalogStore, RetrievalEngine, RetrievalError};
use crate::domain::{ChatRequest, ChatResponse, Product, ProductCard, QueryIntent, SearchFilters};

use super::orchestrator::Orchestrator;
use super::prompts;
use super::safety::SafetyGate;

/// Owns the injected services and exposes the single chat entry point.
pub struct ChatPipeline {
    safety: SafetyGate,
    orchestrator: Orchestrator,
    retrieval: RetrievalEngine,
    store: Arc<CatalogStore>,
    /// Result-set cap for retrieval.
    max_results: usize,
    /// How many retrieved products feed the LLM context block.
    context_size: usize,
}

impl ChatPipeline {
    pub fn new(
        safety: SafetyGate,
        orchestrator: Orchestrator,
        retrieval: RetrievalEngine,
        store: Arc<CatalogStore>,
        max_results: usize,
        context_size: usize,
    ) -> Self {
        Self {
            safety,
            orchestrator,
            retrieval,
            store,
            max_results,
            context_size,
        }
    }

    /// Answer a shopping query. Always returns a well-formed response:
    /// rejected queries get a deflection, internal failures an apology.
    #[instrument(skip(self, request))]
    pub async fn handle_chat(&self, request: &ChatRequest) -> ChatResponse {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Pre-flight gate: a rejected query spends no provider call
        if let Err(violation) = self.safety.check_query(&request.message) {
            if let Err(e) = self.store.record_safety_event(
                Some(&session_id),
                &request.message,
                violation.incident_type(),
            ) {
                warn!(error = %e, "failed to record safety event");
            }

            return ChatResponse::safety_deflection(
                prompts::ADVERSARIAL_MESSAGE.to_string(),
                violation.user_reason().to_string(),
                session_id,
            );
        }

        let intent = self.orchestrator.classify_intent(&request.message).await;

        if matches!(intent, QueryIntent::Adversarial | QueryIntent::Irrelevant) {
            return ChatResponse::off_topic(
                prompts::INAPPROPRIATE_MESSAGE.to_string(),
                intent,
                session_id,
            );
        }

        let filters = self.orchestrator.extract_filters(&request.message).await;

        let products = match self
            .retrieval
            .search(&filters, self.max_results, Some(&session_id))
        {
            Ok(products) => products,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return ChatResponse::internal_failure(
                    prompts::SYSTEM_ERROR_MESSAGE.to_string(),
                    session_id,
                );
            }
        };

        let context = build_context(&products[..products.len().min(self.context_size)]);

        let reply = match self
            .orchestrator
            .generate_reply(&request.message, &context, &request.history)
            .await
        {
            Ok(reply) => self.safety.sanitize_output(&reply),
            Err(e) => {
                // Total provider exhaustion. The response carries no
                // provider names, errors, or credentials.
                error!(error = %e, "response generation failed");
                return ChatResponse::internal_failure(
                    prompts::SYSTEM_ERROR_MESSAGE.to_string(),
                    session_id,
                );
            }
        };

        let cards: Vec<ProductCard> = products.iter().map(ProductCard::from_product).collect();
        let suggestions = if cards.is_empty() {
            Vec::new()
        } else {
            prompts::FOLLOW_UP_SUGGESTIONS
                .iter()
                .map(|s| s.to_string())
                .collect()
        };

        ChatResponse::answer(reply, intent, cards, suggestions, session_id)
    }

    /// Direct catalog search, bypassing the LLM stages.
    pub fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Product>, RetrievalError> {
        self.retrieval.search(filters, limit, None)
    }

    /// Resolve 2-3 products for comparison.
    pub fn compare(&self, ids: &[i64]) -> Result<Vec<Product>, RetrievalError> {
        self.retrieval.compare(ids, None)
    }

    /// Fetch one product by id.
    pub fn product(&self, id: i64) -> Result<Option<Product>, RetrievalError> {
        self.retrieval.product(id)
    }
}

/// Render the retrieved products into the context block the response
/// generator is grounded on.
fn build_context(products: &[Product]) -> String {
    products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let charging = match p.fast_charging {
                Some(watts) => format!("{watts}W charging"),
                None => "standard charging".to_string(),
            };

            format!(
                "Phone {}: {} by {}\n\
                 Price: ₹{:.0}\n\
                 Display: {}\" {}, {}Hz\n\
                 Processor: {}\n\
                 RAM/Storage: {}GB / {}GB\n\
                 Camera: {} (OIS: {})\n\
                 Battery: {}mAh, {}\n\
                 Highlights: {}\n\
                 Pros: {}",
                i + 1,
                p.name,
                p.brand,
                p.price,
                p.display_size,
                p.display_type,
                p.refresh_rate,
                p.processor,
                p.ram,
                p.storage,
                p.rear_camera,
                p.has_ois,
                p.battery_capacity,
                charging,
                p.highlights.join(", "),
                p.pros.join(", "),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
