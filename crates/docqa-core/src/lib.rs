//! # docqa core
//!
//! Runtime-agnostic logic for answering questions about a single reference
//! document: sentence-bounded chunking, a per-document vector index, query
//! rewriting over conversation history, grounded answering, answer-quality
//! scoring and tiered fallback.
//!
//! This crate contains no tokio, HTTP or filesystem code. External services
//! (embedding model, text generation, web search) are consumed through the
//! traits in [`embedding`] and [`services`]; the host application supplies
//! concrete implementations and enforces call timeouts.
//!
//! ## Question flow
//!
//! ```text
//! question ─▶ rewrite ─▶ Index::search ─▶ answer ─▶ score ─▶ fallback ─▶ AnswerResult
//!               ▲                                                           │
//!               └──────────────── ConversationHistory ◀─────────────────────┘
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod index;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod rewrite;
pub mod score;
pub mod services;
pub mod settings;
pub mod text;

#[cfg(test)]
mod testing;

pub use error::RagError;
