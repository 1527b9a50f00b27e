//! Grounded answer generation.
//!
//! Builds a bounded context block from the retrieved passages (in retrieval
//! order), asks the generator to answer strictly from it, and cleans up the
//! reply. The generator is told to use a "not found" sentinel when the
//! context is insufficient; a sentinel that trails real content is a
//! hedge and is cut off, a sentinel that is the whole reply is kept.

use crate::error::RagError;
use crate::models::Chunk;
use crate::services::Generator;
use crate::settings::AnswerParams;
use crate::text::{clip, find_ignore_ascii_case};

/// Generate an answer to `query` from `passages`.
///
/// # Errors
///
/// [`RagError::GenerationFailure`] when the call fails or the reply is
/// empty; a collaborator timeout is passed through as [`RagError::Timeout`].
pub async fn answer(
    generator: &dyn Generator,
    query: &str,
    passages: &[Chunk],
    params: &AnswerParams,
) -> Result<String, RagError> {
    let prompt = grounded_prompt(query, passages, params);
    let raw = generator
        .generate(&prompt, params.max_tokens, params.temperature)
        .await
        .map_err(|e| RagError::from_collaborator(e, RagError::GenerationFailure))?;

    if raw.trim().is_empty() {
        return Err(RagError::generation("empty response"));
    }
    Ok(strip_hedge(&raw, params))
}

/// Passages joined in order, capped at `max_chars` characters.
pub fn context_block(passages: &[Chunk], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for p in passages {
        let len = p.text.chars().count();
        let sep = if out.is_empty() { 0 } else { 2 };
        if used + sep + len > max_chars {
            if out.is_empty() {
                out = clip(&p.text, max_chars);
            }
            break;
        }
        if sep > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&p.text);
        used += sep + len;
    }
    out
}

pub fn grounded_prompt(query: &str, passages: &[Chunk], params: &AnswerParams) -> String {
    format!(
        "You are an assistant for question-answering tasks. \
         Use the following pieces of retrieved context to answer the question. \
         If the context does not contain the answer, just say '{}'. \
         Use {} sentences maximum and keep the answer concise.\n\n\
         Context:\n{}\n\nQuestion: {}\nAnswer:",
        params.sentinel(),
        params.max_sentences,
        context_block(passages, params.max_context_chars),
        query.trim()
    )
}

/// Earliest occurrence of any sentinel phrase: `(start, end)` byte offsets.
fn find_sentinel(text: &str, params: &AnswerParams) -> Option<(usize, usize)> {
    params
        .not_found_phrases
        .iter()
        .filter(|p| !p.is_empty())
        .filter_map(|p| find_ignore_ascii_case(text, p).map(|i| (i, i + p.len())))
        .min_by_key(|&(i, _)| i)
}

fn meaningful_chars(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Cut a trailing "I don't know" hedge off a substantive answer.
///
/// Leaves the text untouched when there is no sentinel, or when the
/// sentinel is (nearly) the whole reply.
pub fn strip_hedge(text: &str, params: &AnswerParams) -> String {
    let trimmed = text.trim();
    let Some((start, _)) = find_sentinel(trimmed, params) else {
        return trimmed.to_string();
    };

    let prefix = trimmed[..start].trim_end();
    if prefix.chars().count() <= params.hedge_min_prefix_chars {
        return trimmed.to_string();
    }

    // Keep whole sentences when there are any; otherwise drop the dangling
    // connective ("..., but") left in front of the sentinel.
    let cut = match last_sentence_end(prefix) {
        Some(end) if meaningful_chars(&prefix[..end]) > 0 => &prefix[..end],
        _ => trim_connective(prefix),
    };
    cut.trim().to_string()
}

/// Byte offset just past the last terminator that ends a sentence: one
/// followed by the end of `s`, or by whitespace and then a capital letter.
/// Decimals ("0.12") and abbreviations ("e.g. trees") do not qualify.
fn last_sentence_end(s: &str) -> Option<usize> {
    let mut last = None;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = i + c.len_utf8();
        // A run like "?!" or "..." ends where the run ends.
        while let Some(&(j, n)) = chars.peek() {
            if !matches!(n, '.' | '!' | '?') {
                break;
            }
            end = j + n.len_utf8();
            chars.next();
        }
        let rest = &s[end..];
        let ends = match rest.trim_start().chars().next() {
            None => true,
            Some(n) => rest.starts_with(char::is_whitespace) && n.is_uppercase(),
        };
        if ends {
            last = Some(end);
        }
    }
    last
}

const CONNECTIVES: &[&str] = &["but", "and", "however", "although", "though", "yet", "so"];

fn trim_connective(s: &str) -> &str {
    let is_sep = |c: char| matches!(c, ',' | ';' | ':' | '-') || c.is_whitespace();
    let s = s.trim_end_matches(is_sep);
    let last_word_start = s.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
    if CONNECTIVES
        .iter()
        .any(|c| s[last_word_start..].eq_ignore_ascii_case(c))
    {
        s[..last_word_start].trim_end_matches(is_sep)
    } else {
        s
    }
}

/// True when the reply is only the sentinel (give or take a few words) or
/// empty.
pub fn is_not_found(text: &str, params: &AnswerParams) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    match find_sentinel(trimmed, params) {
        Some((start, end)) => {
            let rest = meaningful_chars(&trimmed[..start]) + meaningful_chars(&trimmed[end..]);
            rest <= params.hedge_min_prefix_chars
        }
        None => false,
    }
}
