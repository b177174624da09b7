//! shopscout - AI shopping assistant for mobile phones
//!
//! Answers natural-language shopping queries by classifying intent,
//! extracting structured filters, retrieving matching products, and
//! generating a grounded reply.
//!
//! # Architecture
//!
//! Two independent cores composed by a coordinator:
//! - The generation orchestrator calls interchangeable LLM backends in
//!   priority order, with one circuit breaker per provider, bounded
//!   per-call timeouts, and retries for transient failures only.
//! - The retrieval engine turns a filter object into a deterministic,
//!   keyword-ranked, size-bounded product list over a SQLite catalog.
//!
//! A pattern-based safety gate runs before any paid provider call.
//!
//! # Modules
//!
//! - `providers`: Backend adapters (Gemini, OpenAI, Anthropic, mock)
//! - `core`: Breaker, retry, orchestrator, safety gate, chat pipeline
//! - `catalog`: Product store, retrieval engine, seeding
//! - `domain`: Data structures (Product, SearchFilters, ChatResponse)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Load the demo catalog
//! shopscout seed
//!
//! # Ask a question
//! shopscout chat "best camera phone under 30000"
//!
//! # Direct catalog access
//! shopscout search --max-price 30000 --min-ram 8
//! shopscout compare 1 3
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod providers;

// Re-export main types at crate root for convenience
pub use crate::catalog::{CatalogStore, RetrievalEngine, RetrievalError};
pub use crate::core::{BreakerMap, ChatPipeline, CircuitBreaker, Orchestrator, SafetyGate};
pub use crate::domain::{ChatRequest, ChatResponse, Product, QueryIntent, SearchFilters};
pub use crate::providers::{GenerationRequest, Provider, ProviderError, ProviderKind};
