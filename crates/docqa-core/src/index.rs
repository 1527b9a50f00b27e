//! Per-document vector index.
//!
//! An [`Index`] is built once from a document's chunks and is read-only
//! afterwards, so any number of questions may search it concurrently.
//! Search is brute-force cosine similarity over every stored vector.
//!
//! # Build
//!
//! Chunks are embedded in batches of `batch_size`. When a batch call fails
//! (or returns the wrong number of vectors) each of its chunks is retried
//! on its own; a chunk that still fails is dropped and logged. The index
//! therefore never holds an entry whose vector does not belong to its chunk.
//!
//! # Search
//!
//! The query is embedded once, scored against every entry, and the top `k`
//! returned by descending score, ties broken by ascending
//! `sequence_index`.

use std::cmp::Ordering;

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::RagError;
use crate::models::{Chunk, ScoredChunk};

/// Number of passages returned when the caller has no preference.
pub const DEFAULT_TOP_K: usize = 3;

/// One embedded chunk. Immutable once the index is built.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
    dropped: Vec<usize>,
}

impl Index {
    /// An index with no entries. Searching it yields nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Embed every chunk and build the index.
    pub async fn build(
        embedder: &dyn EmbeddingProvider,
        chunks: &[Chunk],
        batch_size: usize,
    ) -> Self {
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dropped = Vec::new();

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            match embedder.embed(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    for (chunk, vector) in batch.iter().zip(vectors) {
                        if vector.is_empty() {
                            tracing::warn!(chunk = chunk.sequence_index, "empty embedding, dropping chunk");
                            dropped.push(chunk.sequence_index);
                            continue;
                        }
                        entries.push(IndexEntry {
                            chunk: chunk.clone(),
                            vector,
                        });
                    }
                }
                outcome => {
                    match outcome {
                        Ok(vectors) => tracing::warn!(
                            expected = batch.len(),
                            got = vectors.len(),
                            "embedding batch size mismatch, retrying chunks individually"
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            "embedding batch failed, retrying chunks individually"
                        ),
                    }
                    for chunk in batch {
                        match embed_one(embedder, &chunk.text).await {
                            Ok(vector) => entries.push(IndexEntry {
                                chunk: chunk.clone(),
                                vector,
                            }),
                            Err(e) => {
                                tracing::warn!(
                                    chunk = chunk.sequence_index,
                                    error = %e,
                                    "dropping chunk that failed to embed"
                                );
                                dropped.push(chunk.sequence_index);
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(
            model = embedder.model_name(),
            indexed = entries.len(),
            dropped = dropped.len(),
            "index built"
        );

        Self { entries, dropped }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Sequence indices of chunks that could not be embedded.
    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }

    /// Embed `query` and return the `k` most similar chunks.
    ///
    /// An empty index returns `Ok(vec![])` without calling the embedder.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingFailure`] (or a collaborator timeout) when the
    /// query cannot be embedded after `retries` extra attempts.
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
        retries: u32,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        let query_vec = loop {
            match embed_one(embedder, query).await {
                Ok(v) => break v,
                Err(e) if attempt < retries => {
                    tracing::debug!(attempt, error = %e, "query embedding failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        Ok(self.search_vector(&query_vec, k))
    }

    /// Rank entries against a pre-computed query vector.
    pub fn search_vector(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
        });
        scored.truncate(k.min(self.entries.len()));
        scored
    }
}

async fn embed_one(embedder: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>, RagError> {
    let vectors = embedder
        .embed(&[text.to_string()])
        .await
        .map_err(|e| RagError::from_collaborator(e, RagError::EmbeddingFailure))?;
    vectors
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RagError::embedding("empty embedding response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;
    use crate::testing::{FlakyEmbedder, WordEmbedder};

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        split("doc", &texts.join(" "), 1, 0).unwrap().chunks
    }

    #[tokio::test]
    async fn test_search_empty_index_returns_nothing() {
        let index = Index::empty();
        let hits = index.search(&WordEmbedder, "anything", 5, 1).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let cs = chunks(&[
            "Boosting trains models sequentially.",
            "Bagging trains models on bootstrap samples.",
            "Kubernetes schedules containers.",
        ]);
        let index = Index::build(&WordEmbedder, &cs, 2).await;
        assert_eq!(index.len(), 3);

        let hits = index.search(&WordEmbedder, "what is bagging", 3, 0).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].chunk.text.contains("Bagging"));
        assert!(hits[0].score > 0.0);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_k_is_clamped_to_index_size() {
        let cs = chunks(&["Alpha one.", "Beta two."]);
        let index = Index::build(&WordEmbedder, &cs, 10).await;
        let hits = index.search(&WordEmbedder, "alpha", 10, 0).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_ties_broken_by_sequence_index() {
        let cs = chunks(&["Same words here.", "Same words here.", "Same words here."]);
        let index = Index::build(&WordEmbedder, &cs, 10).await;
        for _ in 0..3 {
            let hits = index.search(&WordEmbedder, "same words", 3, 0).await.unwrap();
            let order: Vec<usize> = hits.iter().map(|h| h.chunk.sequence_index).collect();
            assert_eq!(order, vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn test_failed_batch_retries_individually_and_drops_poison() {
        let cs = chunks(&["Good chunk one.", "POISON chunk.", "Good chunk three."]);
        let embedder = FlakyEmbedder::new("POISON");
        let index = Index::build(&embedder, &cs, 3).await;
        assert_eq!(index.len(), 2);
        assert_eq!(index.dropped(), &[1]);
        assert!(index
            .entries()
            .iter()
            .all(|e| !e.chunk.text.contains("POISON")));
    }

    #[tokio::test]
    async fn test_all_chunks_failing_yields_empty_index() {
        let cs = chunks(&["POISON a.", "POISON b."]);
        let index = Index::build(&FlakyEmbedder::new("POISON"), &cs, 2).await;
        assert!(index.is_empty());
        let hits = index.search(&WordEmbedder, "a", 3, 0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_typed() {
        let cs = chunks(&["Fine text."]);
        let index = Index::build(&WordEmbedder, &cs, 1).await;
        let err = index
            .search(&FlakyEmbedder::new("POISON"), "POISON query", 3, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure(_)));
    }
}
