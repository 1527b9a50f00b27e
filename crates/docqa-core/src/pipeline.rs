//! End-to-end question answering over one indexed document.
//!
//! [`Pipeline::index_document`] runs once per upload; [`Pipeline::ask`] runs
//! once per question, strictly in the order rewrite → search → answer →
//! score → fallback. The pipeline holds no per-document or per-user state:
//! the index and the conversation history are handed in by the caller.

use std::sync::Arc;

use crate::answer;
use crate::chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::fallback::{self, Enrichers};
use crate::index::Index;
use crate::models::{
    AnswerResult, AnswerSource, Chunk, ChunkSet, ConversationHistory, ConversationTurn, Tier,
};
use crate::rewrite;
use crate::score::{self, Evidence};
use crate::services::{Generator, WebSearch};
use crate::settings::PipelineParams;

/// Chunks and index for a freshly uploaded document.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub chunks: ChunkSet,
    pub index: Index,
}

pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    web: Option<Arc<dyn WebSearch>>,
    params: PipelineParams,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
        web: Option<Arc<dyn WebSearch>>,
        params: PipelineParams,
    ) -> Self {
        Self {
            embedder,
            generator,
            web,
            params,
        }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Chunk `raw_text` and build its index.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyDocument`] for blank input. Chunks that fail to
    /// embed are dropped, not reported as errors.
    pub async fn index_document(
        &self,
        document_id: &str,
        raw_text: &str,
    ) -> Result<PreparedDocument, RagError> {
        let chunks = chunk::split(
            document_id,
            raw_text,
            self.params.chunking.target_chars,
            self.params.chunking.overlap_chars,
        )?;
        if chunks.low_confidence {
            tracing::warn!(document = document_id, "no sentence structure found, using fixed windows");
        }
        let index = Index::build(
            self.embedder.as_ref(),
            &chunks.chunks,
            self.params.retrieval.batch_size,
        )
        .await;
        Ok(PreparedDocument { chunks, index })
    }

    /// Answer `question` against `index` and append the exchange to
    /// `history`.
    ///
    /// Never fails: a question that cannot be processed yields a result
    /// tagged [`AnswerSource::Error`].
    pub async fn ask(
        &self,
        index: &Index,
        low_confidence: bool,
        history: &mut ConversationHistory,
        question: &str,
    ) -> AnswerResult {
        let result = self.answer_question(index, low_confidence, history, question).await;
        history.push(ConversationTurn::user(question.trim()));
        history.push(ConversationTurn::assistant(result.text.clone()));
        result
    }

    async fn answer_question(
        &self,
        index: &Index,
        low_confidence: bool,
        history: &ConversationHistory,
        question: &str,
    ) -> AnswerResult {
        let p = &self.params;

        let query = rewrite::rewrite(
            self.generator.as_ref(),
            history.turns(),
            question,
            &p.rewrite,
        )
        .await;
        tracing::debug!(query = %query.text, origin = ?query.origin, "standalone query");

        let hits = match index
            .search(
                self.embedder.as_ref(),
                &query.text,
                p.retrieval.top_k,
                p.retrieval.query_retries,
            )
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(error = %e, "query could not be embedded");
                return AnswerResult {
                    text: p.fallback.error_message.clone(),
                    tier: Tier::Ungrounded,
                    chunks_used: 0,
                    source: AnswerSource::Error,
                };
            }
        };
        let passages: Vec<Chunk> = hits.into_iter().map(|h| h.chunk).collect();

        let raw_answer = if passages.is_empty() {
            p.answer.sentinel().to_string()
        } else {
            match answer::answer(self.generator.as_ref(), &query.text, &passages, &p.answer).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "grounded answer failed, treating as not found");
                    p.answer.sentinel().to_string()
                }
            }
        };

        let report = score::score(
            &Evidence {
                query: &query.text,
                answer: &raw_answer,
                passages: &passages,
                low_confidence,
            },
            &p.scoring,
            &p.answer,
        );

        let enrichers = Enrichers {
            generator: self.generator.as_ref(),
            web: self.web.as_deref(),
        };
        let result = fallback::resolve(
            report.tier,
            &query.text,
            &raw_answer,
            passages.len(),
            enrichers,
            &p.fallback,
        )
        .await;

        tracing::info!(
            tier = ?result.tier,
            source = %result.source,
            chunks = result.chunks_used,
            "question answered"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::{CannedWeb, FlakyEmbedder, ScriptedGenerator, WordEmbedder};

    const BAGGING: &str = "Bagging trains models on bootstrap samples. \
                           Boosting trains models sequentially, each correcting the prior's errors.";

    fn pipeline(generator: ScriptedGenerator) -> Pipeline {
        Pipeline::new(
            Arc::new(WordEmbedder),
            Arc::new(generator),
            None,
            PipelineParams::default(),
        )
    }

    #[tokio::test]
    async fn test_bagging_question_is_grounded() {
        let p = pipeline(ScriptedGenerator::fixed("Bagging trains models on bootstrap samples."));
        let doc = p.index_document("doc-1", BAGGING).await.unwrap();
        assert_eq!(doc.chunks.chunks.len(), 1);

        let mut history = ConversationHistory::new();
        let r = p.ask(&doc.index, false, &mut history, "What is bagging?").await;
        assert_eq!(r.tier, Tier::Grounded);
        assert_eq!(r.source, AnswerSource::Document);
        assert_eq!(r.chunks_used, 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, Role::User);
        assert_eq!(history.turns()[1].content, r.text);
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let p = pipeline(ScriptedGenerator::fixed("unused"));
        let err = p.index_document("doc", "   \n ").await.unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_query_embedding_failure_yields_error_result() {
        let p = Pipeline::new(
            Arc::new(FlakyEmbedder::new("POISON")),
            Arc::new(ScriptedGenerator::fixed("unused")),
            None,
            PipelineParams::default(),
        );
        let doc = p.index_document("doc", BAGGING).await.unwrap();
        let mut history = ConversationHistory::new();
        let r = p.ask(&doc.index, false, &mut history, "POISON question").await;
        assert_eq!(r.source, AnswerSource::Error);
        assert_eq!(r.text, PipelineParams::default().fallback.error_message);
    }

    #[tokio::test]
    async fn test_empty_index_goes_straight_to_fallback() {
        let web = CannedWeb {
            results: Some(vec![crate::models::WebResult {
                title: "Bagging".to_string(),
                url: "https://example.org/bagging".to_string(),
                snippet: "Bootstrap aggregating.".to_string(),
            }]),
        };
        let p = Pipeline::new(
            Arc::new(WordEmbedder),
            Arc::new(ScriptedGenerator::fixed("Bagging is bootstrap aggregating.")),
            Some(Arc::new(web)),
            PipelineParams::default(),
        );
        let mut history = ConversationHistory::new();
        let r = p.ask(&Index::empty(), false, &mut history, "What is bagging?").await;
        assert_eq!(r.tier, Tier::Ungrounded);
        assert_eq!(r.source, AnswerSource::NotFound);
        assert_eq!(r.chunks_used, 0);
        assert!(r.text.starts_with("I don't know"));
        assert!(r.text.contains("https://example.org/bagging"));
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_to_not_found() {
        let p = pipeline(ScriptedGenerator::failing());
        let doc = p.index_document("doc", BAGGING).await.unwrap();
        let mut history = ConversationHistory::new();
        let r = p.ask(&doc.index, false, &mut history, "Who invented gradient descent?").await;
        assert_eq!(r.source, AnswerSource::NotFound);
        assert_eq!(r.text, "I don't know");
    }

    #[tokio::test]
    async fn test_follow_up_acknowledgement_reuses_previous_question() {
        let gen = ScriptedGenerator::new(|prompt| {
            Ok(if prompt.contains("Question: What is bagging?") {
                "Bagging trains models on bootstrap samples.".to_string()
            } else {
                "I don't know.".to_string()
            })
        });
        let p = pipeline(gen);
        let doc = p.index_document("doc", BAGGING).await.unwrap();
        let mut history = ConversationHistory::new();
        p.ask(&doc.index, false, &mut history, "What is bagging?").await;
        let r = p.ask(&doc.index, false, &mut history, "ok").await;
        assert_eq!(r.tier, Tier::Grounded);
        assert_eq!(history.len(), 4);
    }
}
