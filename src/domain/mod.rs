//! Domain types for the shopping assistant.
//!
//! This module contains the core data structures:
//! - Product: Catalog rows and their UI projection
//! - Filters: Structured search constraints
//! - Chat: Request/response surface and intents

pub mod chat;
pub mod filters;
pub mod product;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, QueryIntent};
pub use filters::SearchFilters;
pub use product::{Brand, PriceRange, Product, ProductCard};
