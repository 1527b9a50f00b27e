//! Document source: turns an uploaded file into raw text.
//!
//! PDFs go through `pdf-extract`; plain text and Markdown are decoded as
//! UTF-8 (lossily, so that binary garbage still reaches the chunker's
//! fixed-window fallback rather than failing here).

use std::path::Path;

use thiserror::Error;

use docqa_core::models::DocumentMetadata;
use docqa_core::RagError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ExtractError> for RagError {
    fn from(e: ExtractError) -> Self {
        RagError::Extraction(e.to_string())
    }
}

/// Text handed to the pipeline by the document source.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name or other label, for logs.
    pub name: String,
    pub raw_text: String,
    /// Metadata from the source, if it has any. When `None` the library
    /// guesses it from the text.
    pub metadata: Option<DocumentMetadata>,
}

impl SourceDocument {
    pub fn from_text(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_text: raw_text.into(),
            metadata: None,
        }
    }
}

/// Extract plain text from `bytes` of the given content type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(ExtractError::UnsupportedContentType(other.to_string())),
    }
}

/// Content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => MIME_PDF,
        Some("md") | Some("markdown") => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}

/// Read and extract a file from disk.
pub fn load_file(path: &Path) -> Result<SourceDocument, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let raw_text = extract_text(&bytes, content_type_for(path))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceDocument::from_text(name, raw_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for(Path::new("paper.PDF")), MIME_PDF);
        assert_eq!(content_type_for(Path::new("notes.md")), MIME_MARKDOWN);
        assert_eq!(content_type_for(Path::new("notes")), MIME_TEXT);
    }

    #[test]
    fn test_text_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bagging.txt");
        std::fs::write(&path, "Bagging trains models on bootstrap samples.").unwrap();
        let doc = load_file(&path).unwrap();
        assert_eq!(doc.name, "bagging.txt");
        assert_eq!(doc.raw_text, "Bagging trains models on bootstrap samples.");
        assert!(doc.metadata.is_none());
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        let rag: RagError = err.into();
        assert!(matches!(rag, RagError::Extraction(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_unsupported_type() {
        assert!(matches!(
            extract_text(b"x", "image/png"),
            Err(ExtractError::UnsupportedContentType(_))
        ));
    }
}
