//! Per-call deadlines for collaborators.
//!
//! [`Timed`] wraps any embedding, generation or web search collaborator and
//! fails a call that exceeds its deadline with [`RagError::Timeout`], which
//! the pipeline then handles as that stage's failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use docqa_core::embedding::EmbeddingProvider;
use docqa_core::models::WebResult;
use docqa_core::services::{Generator, WebSearch};
use docqa_core::RagError;

pub struct Timed<P: ?Sized> {
    inner: Arc<P>,
    stage: &'static str,
    limit: Duration,
}

impl<P: ?Sized> Timed<P> {
    pub fn new(inner: Arc<P>, stage: &'static str, secs: u64) -> Self {
        Self {
            inner,
            stage,
            limit: Duration::from_secs(secs),
        }
    }

    async fn run<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(stage = self.stage, secs = self.limit.as_secs(), "call timed out");
                Err(anyhow::Error::new(RagError::Timeout {
                    stage: self.stage,
                    secs: self.limit.as_secs(),
                }))
            }
        }
    }
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Timed<P> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.run(self.inner.embed(texts)).await
    }
}

#[async_trait]
impl<P: Generator + ?Sized> Generator for Timed<P> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        self.run(self.inner.generate(prompt, max_tokens, temperature))
            .await
    }
}

#[async_trait]
impl<P: WebSearch + ?Sized> WebSearch for Timed<P> {
    async fn search_web(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        self.run(self.inner.search_web(query, max_results)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy;

    #[async_trait]
    impl Generator for Sleepy {
        fn model_name(&self) -> &str {
            "sleepy"
        }
        async fn generate(&self, _p: &str, _m: u32, _t: f32) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    struct Quick;

    #[async_trait]
    impl Generator for Quick {
        fn model_name(&self) -> &str {
            "quick"
        }
        async fn generate(&self, _p: &str, _m: u32, _t: f32) -> Result<String> {
            Ok("fast".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_with_typed_error() {
        let timed = Timed::new(Arc::new(Sleepy), "generation", 5);
        let err = timed.generate("q", 10, 0.0).await.unwrap_err();
        match err.downcast_ref::<RagError>() {
            Some(RagError::Timeout { stage, secs }) => {
                assert_eq!(*stage, "generation");
                assert_eq!(*secs, 5);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let inner: Arc<dyn Generator> = Arc::new(Quick);
        let timed = Timed::new(inner, "generation", 5);
        assert_eq!(timed.generate("q", 10, 0.0).await.unwrap(), "fast");
        assert_eq!(timed.model_name(), "quick");
    }
}
