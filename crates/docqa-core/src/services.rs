//! Collaborator traits for text generation and web search.
//!
//! Both are black-box services consumed at an in-process function-call
//! boundary. Implementations are expected to be cheap to share (`Send +
//! Sync`) and to fail with an error rather than hang; the application
//! wraps them with per-call deadlines.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::WebResult;

/// A large-language-model completion service.
///
/// Used for grounded answering (prompt carries the passages), general
/// knowledge fallback (no passages) and query rewriting.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}

/// An optional web search service.
///
/// `Ok(vec![])` means "nothing found"; an error means the service is
/// unavailable. Neither is fatal to a question.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search_web(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>>;
}
