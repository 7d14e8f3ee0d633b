//! Speaker Advisory Engine
//!
//! A persona-grounded advisory service that:
//! - Routes each query to a booking stub or the intelligence pipeline
//! - Retrieves context from vector and graph backends concurrently
//! - Merges both result lists with reciprocal rank fusion
//! - Reranks the fused set with an LLM relevance judge
//! - Generates answers conditioned on the speaker's persona
//! - Runs two-persona round-table debates with a moderated synthesis
//!
//! ADVISORY PIPELINE:
//! ROUTE → RETRIEVE (vector ∥ graph) → FUSE → RERANK → GENERATE

pub mod api;
pub mod config;
pub mod debate;
pub mod error;
pub mod generation;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod retrieval;
pub mod router;
pub mod speakers;
pub mod transcript;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use router::IntentRouter;
