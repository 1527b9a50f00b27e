//! Typed failures surfaced across the public contract of the pipeline.
//!
//! Collaborator traits return `anyhow::Result`; the stage that calls them
//! maps those failures into one of these variants. Optional stages (general
//! knowledge, web search) log and swallow their variants instead of
//! returning them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The raw text had nothing to chunk. Surfaced as an upload rejection.
    #[error("document is empty: no extractable text")]
    EmptyDocument,

    /// A chunk or query could not be embedded after retrying.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    /// The generation service failed or returned nothing usable.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// The web search collaborator is absent or failed.
    #[error("web search unavailable: {0}")]
    SearchUnavailable(String),

    /// An external call exceeded its deadline.
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// A question was asked for an owner with no live document.
    #[error("no document loaded for {0}")]
    NoDocument(String),

    /// The document source could not produce text.
    #[error("text extraction failed: {0}")]
    Extraction(String),
}

impl RagError {
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Self::EmbeddingFailure(err.to_string())
    }

    pub fn generation(err: impl std::fmt::Display) -> Self {
        Self::GenerationFailure(err.to_string())
    }

    /// Convert a collaborator error into a typed one, keeping any
    /// `RagError` (e.g. a timeout) the collaborator already attached.
    pub fn from_collaborator(err: anyhow::Error, wrap: fn(String) -> RagError) -> Self {
        match err.downcast::<RagError>() {
            Ok(typed) => typed,
            Err(other) => wrap(format!("{:#}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_is_wrapped() {
        let err = RagError::from_collaborator(
            anyhow::anyhow!("connection refused"),
            RagError::EmbeddingFailure,
        );
        assert!(matches!(err, RagError::EmbeddingFailure(ref m) if m.contains("refused")));
    }

    #[test]
    fn test_typed_error_survives_conversion() {
        let err = RagError::from_collaborator(
            anyhow::Error::new(RagError::Timeout {
                stage: "generation",
                secs: 5,
            }),
            RagError::GenerationFailure,
        );
        assert!(matches!(err, RagError::Timeout { stage: "generation", secs: 5 }));
    }
}
