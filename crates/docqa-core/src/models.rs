//! Core data models shared by every pipeline stage.
//!
//! A [`Document`] owns its [`Chunk`]s; the vector index built over them
//! lives in [`crate::index`]. Conversation turns and answer results are
//! plain values passed in and out of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Light metadata supplied by the document source, or guessed from the
/// text when the source has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub arxiv_id: Option<String>,
}

/// The one live document of an owner.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub owner: String,
    pub raw_text: String,
    pub metadata: DocumentMetadata,
    pub chunks: Vec<Chunk>,
    /// Set when sentence segmentation failed and the chunks are fixed-size
    /// character windows.
    pub low_confidence: bool,
    pub created_at: DateTime<Utc>,
}

/// A contiguous slice of a document's raw text used as a retrieval unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub sequence_index: usize,
    pub text: String,
    /// Byte offsets `(start, end)` into the document's raw text.
    pub source_span: (usize, usize),
    /// SHA-256 of `text`.
    pub hash: String,
}

/// The result of chunking one document.
#[derive(Debug, Clone)]
pub struct ChunkSet {
    pub chunks: Vec<Chunk>,
    pub low_confidence: bool,
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only record of one chat session.
///
/// The session collaborator owns its lifecycle; the pipeline only reads it
/// and appends the turns of each question it answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl From<Vec<ConversationTurn>> for ConversationHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}

/// How well an answer is supported by the retrieved passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Grounded,
    Partial,
    Ungrounded,
}

/// Where the final answer text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Document,
    DocumentPartial,
    NotFound,
    Error,
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnswerSource::Document => "document",
            AnswerSource::DocumentPartial => "document_partial",
            AnswerSource::NotFound => "not_found",
            AnswerSource::Error => "error",
        };
        f.write_str(s)
    }
}

/// Final response for one question. Produced fresh, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub text: String,
    pub tier: Tier,
    pub chunks_used: usize,
    pub source: AnswerSource,
}

/// One hit from the web search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}
