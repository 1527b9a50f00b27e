//! Per-owner document registry.
//!
//! Every owner has at most one live document. Each owner's slot is guarded
//! by its own `RwLock`:
//!
//! - [`Library::upload`] holds the write lock while it deletes the previous
//!   document and builds the new index, so it waits for in-flight questions
//!   and no question ever sees a half-replaced index.
//! - [`Library::ask`] holds the read lock for the whole question; questions
//!   against the same document run concurrently.
//!
//! Owners never share a lock, so one user's upload does not stall another
//! user's questions.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use docqa_core::index::Index;
use docqa_core::metadata;
use docqa_core::models::{AnswerResult, ConversationHistory, Document, DocumentMetadata};
use docqa_core::pipeline::Pipeline;
use docqa_core::RagError;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::extract::SourceDocument;
use crate::generation::create_generator;
use crate::timeout::Timed;
use crate::web_search::create_web_search;

const PREVIEW_CHARS: usize = 500;

struct ActiveDocument {
    document: Document,
    index: Index,
    fingerprint: String,
}

type Slot = Arc<RwLock<Option<ActiveDocument>>>;

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub document_id: String,
    pub chunks: usize,
    pub indexed: usize,
    /// Sequence indices of chunks that failed to embed.
    pub dropped: Vec<usize>,
    pub low_confidence: bool,
    pub preview: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub document_id: String,
    pub title: Option<String>,
    pub chunks: usize,
    pub indexed: usize,
    pub dropped: usize,
    pub low_confidence: bool,
    /// SHA-256 of the raw text.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

pub struct Library {
    pipeline: Pipeline,
    owners: Mutex<HashMap<String, Slot>>,
}

impl Library {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            owners: Mutex::new(HashMap::new()),
        }
    }

    /// Wire up the configured collaborators, each under its own deadline.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = Arc::new(Timed::new(
            create_provider(&config.embedding)?,
            "embedding",
            config.embedding.timeout_secs,
        ));
        let generator = Arc::new(Timed::new(
            create_generator(&config.generation)?,
            "generation",
            config.generation.timeout_secs,
        ));
        let web = create_web_search(&config.web_search)?.map(|web| {
            Arc::new(Timed::new(web, "web search", config.web_search.timeout_secs))
                as Arc<dyn docqa_core::services::WebSearch>
        });

        tracing::info!(
            embedding = %config.embedding.provider,
            generation = %config.generation.provider,
            web_search = web.is_some(),
            "collaborators ready"
        );

        Ok(Self::new(Pipeline::new(
            embedder,
            generator,
            web,
            config.pipeline_params(),
        )))
    }

    async fn slot(&self, owner: &str) -> Slot {
        let mut owners = self.owners.lock().await;
        Arc::clone(owners.entry(owner.to_string()).or_default())
    }

    async fn existing_slot(&self, owner: &str) -> Option<Slot> {
        self.owners.lock().await.get(owner).cloned()
    }

    /// Replace `owner`'s document with `source`.
    ///
    /// The previous document is deleted before the new one is processed; if
    /// processing fails the owner is left with no document.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyDocument`] when `source` has no text.
    pub async fn upload(&self, owner: &str, source: SourceDocument) -> Result<UploadSummary, RagError> {
        let slot = self.slot(owner).await;
        let mut guard = slot.write().await;

        if let Some(previous) = guard.take() {
            tracing::info!(owner, document = %previous.document.id, "deleting previous document");
        }

        let document_id = Uuid::new_v4().to_string();
        let prepared = self
            .pipeline
            .index_document(&document_id, &source.raw_text)
            .await?;

        let metadata = source
            .metadata
            .unwrap_or_else(|| metadata::extract(&source.raw_text));
        let preview = metadata::preview(&source.raw_text, PREVIEW_CHARS);
        let fingerprint = format!("{:x}", Sha256::digest(source.raw_text.as_bytes()));

        let summary = UploadSummary {
            document_id: document_id.clone(),
            chunks: prepared.chunks.chunks.len(),
            indexed: prepared.index.len(),
            dropped: prepared.index.dropped().to_vec(),
            low_confidence: prepared.chunks.low_confidence,
            preview,
            metadata: metadata.clone(),
        };

        tracing::info!(
            owner,
            document = %document_id,
            name = %source.name,
            chunks = summary.chunks,
            indexed = summary.indexed,
            "document uploaded"
        );

        *guard = Some(ActiveDocument {
            document: Document {
                id: document_id,
                owner: owner.to_string(),
                raw_text: source.raw_text,
                metadata,
                chunks: prepared.chunks.chunks,
                low_confidence: prepared.chunks.low_confidence,
                created_at: Utc::now(),
            },
            index: prepared.index,
            fingerprint,
        });

        Ok(summary)
    }

    /// Answer `question` against `owner`'s document, appending the exchange
    /// to `history`.
    ///
    /// # Errors
    ///
    /// [`RagError::NoDocument`] when the owner has nothing uploaded. Every
    /// other failure is reported inside the [`AnswerResult`].
    pub async fn ask(
        &self,
        owner: &str,
        history: &mut ConversationHistory,
        question: &str,
    ) -> Result<AnswerResult, RagError> {
        let slot = self
            .existing_slot(owner)
            .await
            .ok_or_else(|| RagError::NoDocument(owner.to_string()))?;
        let guard = slot.read().await;
        let active = guard
            .as_ref()
            .ok_or_else(|| RagError::NoDocument(owner.to_string()))?;

        Ok(self
            .pipeline
            .ask(&active.index, active.document.low_confidence, history, question)
            .await)
    }

    /// Delete `owner`'s document. Returns whether there was one.
    ///
    /// The owner's slot stays registered, so an upload that already holds
    /// it still publishes into the slot that `ask` and `stats` read.
    pub async fn remove(&self, owner: &str) -> bool {
        let Some(slot) = self.existing_slot(owner).await else {
            return false;
        };
        let removed = slot.write().await.take();
        if let Some(active) = &removed {
            tracing::info!(owner, document = %active.document.id, "document removed");
        }
        removed.is_some()
    }

    pub async fn stats(&self, owner: &str) -> Option<DocumentStats> {
        let slot = self.existing_slot(owner).await?;
        let guard = slot.read().await;
        guard.as_ref().map(|active| DocumentStats {
            document_id: active.document.id.clone(),
            title: active.document.metadata.title.clone(),
            chunks: active.document.chunks.len(),
            indexed: active.index.len(),
            dropped: active.index.dropped().len(),
            low_confidence: active.document.low_confidence,
            fingerprint: active.fingerprint.clone(),
            created_at: active.document.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ask_without_document() {
        let library = Library::from_config(&Config::minimal()).unwrap();
        let mut history = ConversationHistory::new();
        let err = library.ask("alice", &mut history, "hi").await.unwrap_err();
        assert!(matches!(err, RagError::NoDocument(ref o) if o == "alice"));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_remove_keeps_slot_for_racing_upload() {
        let library = Library::from_config(&Config::minimal()).unwrap();
        library
            .upload("alice", SourceDocument::from_text("a.txt", "First text."))
            .await
            .unwrap();

        // An upload that looked up the slot before the removal.
        let held = library.slot("alice").await;
        assert!(library.remove("alice").await);
        assert!(!library.remove("alice").await);
        assert!(library.stats("alice").await.is_none());

        let summary = library
            .upload("alice", SourceDocument::from_text("b.txt", "Second text."))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&held, &library.slot("alice").await));
        assert_eq!(
            held.read().await.as_ref().map(|a| a.document.id.clone()),
            Some(summary.document_id.clone())
        );
        assert_eq!(library.stats("alice").await.unwrap().document_id, summary.document_id);
    }

    #[tokio::test]
    async fn test_disabled_embedder_still_accepts_upload() {
        let library = Library::from_config(&Config::minimal()).unwrap();
        let summary = library
            .upload(
                "alice",
                SourceDocument::from_text("a.txt", "One sentence. Another sentence."),
            )
            .await
            .unwrap();
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.dropped, vec![0]);

        let stats = library.stats("alice").await.unwrap();
        assert_eq!(stats.indexed, 0);
        assert_eq!(stats.fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_and_clears_previous() {
        let library = Library::from_config(&Config::minimal()).unwrap();
        library
            .upload("bob", SourceDocument::from_text("a.txt", "Some text."))
            .await
            .unwrap();
        let err = library
            .upload("bob", SourceDocument::from_text("b.txt", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument));
        assert!(library.stats("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let library = Library::from_config(&Config::minimal()).unwrap();
        assert!(!library.remove("carol").await);
        library
            .upload("carol", SourceDocument::from_text("a.txt", "Some text."))
            .await
            .unwrap();
        assert!(library.remove("carol").await);
        assert!(library.stats("carol").await.is_none());
    }
}
