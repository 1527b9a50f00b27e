//! Light metadata for uploaded papers.
//!
//! Heuristics over the first lines of extracted text. They are tuned for
//! academic PDFs (title on top, author line with commas, arXiv stamp) and
//! simply return `None` for anything else.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::DocumentMetadata;
use crate::text::forward_chars;

const HEAD_LINES: usize = 20;
const TITLE_LINES: usize = 5;
const AUTHOR_LINES: usize = 10;

pub fn extract(raw_text: &str) -> DocumentMetadata {
    let head: Vec<&str> = raw_text
        .lines()
        .take(HEAD_LINES)
        .map(str::trim)
        .collect();

    DocumentMetadata {
        title: find_title(&head),
        authors: find_authors(&head),
        arxiv_id: find_arxiv_id(&head),
    }
}

fn arxiv_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)arxiv:\s*(\d{4}\.\d{4,5})",
            r"(?i)arxiv\.org/abs/(\d{4}\.\d{4,5})",
            r"\b(\d{4}\.\d{4,5})\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn find_arxiv_id(lines: &[&str]) -> Option<String> {
    lines.iter().find_map(|line| {
        arxiv_patterns()
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn find_title(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(TITLE_LINES)
        .find(|line| {
            let lower = line.to_lowercase();
            line.chars().count() > 10
                && !["abstract", "introduction", "arxiv", "doi"]
                    .iter()
                    .any(|w| lower.contains(w))
                && line.chars().any(|c| c.is_lowercase())
        })
        .map(|line| line.to_string())
}

fn find_authors(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(AUTHOR_LINES)
        .filter(|line| line.chars().count() >= 3)
        .find(|line| {
            let lower = line.to_lowercase();
            (line.contains(',') || lower.contains(" and "))
                && !["email", "@", "university", "department"]
                    .iter()
                    .any(|w| lower.contains(w))
        })
        .map(|line| line.to_string())
}

/// The opening of the document, cut at a sentence or word boundary.
pub fn preview(raw_text: &str, max_chars: usize) -> String {
    let text = raw_text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head = &text[..forward_chars(text, 0, max_chars)];
    let head_chars = |end: usize| head[..end].chars().count();

    if let Some(i) = head.rfind('.') {
        if head_chars(i) * 10 > max_chars * 7 {
            return head[..=i].to_string();
        }
    }
    let cut = match head.rfind(char::is_whitespace) {
        Some(i) if head_chars(i) * 10 > max_chars * 8 => &head[..i],
        _ => head,
    };
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "Attention Is All You Need\n\
                         Ashish Vaswani, Noam Shazeer, Niki Parmar\n\
                         Google Brain, avaswani@google.com\n\
                         arXiv:1706.03762v7 [cs.CL] 2 Aug 2023\n\
                         Abstract\n\
                         The dominant sequence transduction models are based on recurrent networks.";

    #[test]
    fn test_paper_metadata() {
        let m = extract(PAPER);
        assert_eq!(m.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(m.authors.as_deref(), Some("Ashish Vaswani, Noam Shazeer, Niki Parmar"));
        assert_eq!(m.arxiv_id.as_deref(), Some("1706.03762"));
    }

    #[test]
    fn test_plain_notes_have_no_metadata() {
        let m = extract("TODO\nbuy milk\n");
        assert_eq!(m, DocumentMetadata::default());
    }

    #[test]
    fn test_shouting_header_is_not_a_title() {
        let m = extract("PROCEEDINGS OF THE WORKSHOP\nA Study of Bagging Ensembles\n");
        assert_eq!(m.title.as_deref(), Some("A Study of Bagging Ensembles"));
    }

    #[test]
    fn test_preview_cuts_at_sentence() {
        let text = format!("{}. {}", "a".repeat(80), "b".repeat(100));
        assert_eq!(preview(&text, 100), format!("{}.", "a".repeat(80)));
    }

    #[test]
    fn test_preview_cuts_at_word() {
        let text = "word ".repeat(50);
        let p = preview(&text, 42);
        assert!(p.ends_with("word..."));
        assert!(p.chars().count() <= 45);
        assert_eq!(preview("short text", 500), "short text");
    }
}
