//! Tuning parameters for the pipeline stages, decoupled from application
//! config.
//!
//! Each struct deserializes with per-field defaults so the application can
//! embed it directly as a TOML section. Thresholds are tuning values, not
//! contracts: tests construct their own.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkParams {
    /// Maximum chunk length in characters (oversized sentences excepted).
    pub target_chars: usize,
    /// Characters carried over from the previous chunk.
    pub overlap_chars: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            target_chars: 1000,
            overlap_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalParams {
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Texts per embedding call while building an index.
    pub batch_size: usize,
    /// Extra attempts for a failed query embedding.
    pub query_retries: u32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            batch_size: 10,
            query_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriteParams {
    pub enabled: bool,
    /// Inputs of at most this many characters are acknowledgements.
    pub short_query_max_chars: usize,
    /// Number of most recent turns shown to the generator.
    pub history_window: usize,
    /// Share of the rewrite's content words that must occur in the
    /// conversation for the rewrite to be accepted.
    pub min_grounded_ratio: f64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RewriteParams {
    fn default() -> Self {
        Self {
            enabled: true,
            short_query_max_chars: 3,
            history_window: 6,
            min_grounded_ratio: 0.5,
            max_tokens: 96,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnswerParams {
    /// Phrases the generator is told to use when the context is
    /// insufficient. The first one goes into the prompt.
    pub not_found_phrases: Vec<String>,
    /// Minimum characters of real content before a sentinel for it to be
    /// treated as a hedging suffix and stripped.
    pub hedge_min_prefix_chars: usize,
    /// Upper bound on the concatenated passage context.
    pub max_context_chars: usize,
    pub max_sentences: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnswerParams {
    fn default() -> Self {
        Self {
            not_found_phrases: vec![
                "I don't know".to_string(),
                "I do not know".to_string(),
                "I don\u{2019}t know".to_string(),
            ],
            hedge_min_prefix_chars: 40,
            max_context_chars: 6000,
            max_sentences: 3,
            max_tokens: 300,
            temperature: 0.2,
        }
    }
}

impl AnswerParams {
    pub fn sentinel(&self) -> &str {
        self.not_found_phrases
            .first()
            .map(String::as_str)
            .unwrap_or("I don't know")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// Query words must be longer than this to count as content words.
    pub min_word_chars: usize,
    pub high_lexical: f64,
    pub high_passage: f64,
    pub low_overlap: f64,
    /// Query words ignored when measuring overlap.
    pub stopwords: Vec<String>,
    /// Term → surface variants (inflections, transliterations, synonyms).
    pub variants: BTreeMap<String, Vec<String>>,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            min_word_chars: 3,
            high_lexical: 0.3,
            high_passage: 0.5,
            low_overlap: 0.1,
            stopwords: [
                "what", "which", "when", "where", "does", "about", "this", "that", "these",
                "those", "with", "from", "have", "there", "their", "would", "could", "should",
                "tell", "explain", "describe", "please", "document", "paper",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            variants: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackParams {
    pub general_knowledge: bool,
    pub web_search: bool,
    pub web_max_results: usize,
    pub snippet_chars: usize,
    pub general_header: String,
    pub web_header: String,
    /// Sentences containing any of these are removed from the general
    /// knowledge answer.
    pub boilerplate_markers: Vec<String>,
    /// Text returned when the question could not be processed at all.
    pub error_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for FallbackParams {
    fn default() -> Self {
        Self {
            general_knowledge: true,
            web_search: true,
            web_max_results: 3,
            snippet_chars: 300,
            general_header: "From general knowledge:".to_string(),
            web_header: "From the web:".to_string(),
            boilerplate_markers: vec![
                "i don't know".to_string(),
                "i do not know".to_string(),
                "provided context".to_string(),
                "the context does not".to_string(),
                "based on the context".to_string(),
                "the document does not".to_string(),
            ],
            error_message: "Sorry, I could not search your document right now. Please try again."
                .to_string(),
            max_tokens: 400,
            temperature: 0.7,
        }
    }
}

/// Every stage's parameters in one bundle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub chunking: ChunkParams,
    pub retrieval: RetrievalParams,
    pub rewrite: RewriteParams,
    pub answer: AnswerParams,
    pub scoring: ScoringParams,
    pub fallback: FallbackParams,
}
