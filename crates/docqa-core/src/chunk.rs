//! Sentence-bounded text chunker with overlap.
//!
//! Splits a document's raw text into [`Chunk`]s that respect a
//! `target_chars` limit without ever cutting a sentence in two. Every chunk
//! is a slice of the raw text, so its `source_span` indexes straight back
//! into the document.
//!
//! # Algorithm
//!
//! 1. Segment the text into sentence spans ending at `.`, `!` or `?`
//!    (plus trailing closers such as quotes) followed by whitespace or the
//!    end of the text. A trailing unterminated fragment is its own sentence.
//! 2. Accumulate sentences into a buffer until adding the next one would
//!    exceed `target_chars`.
//! 3. When exceeded, flush the buffer as a chunk and seed the next buffer
//!    with the trailing `overlap_chars` of the flushed one (snapped to a
//!    word start) plus the next sentence.
//! 4. A sentence longer than `target_chars` is flushed as its own
//!    oversized chunk.
//! 5. If segmentation finds no usable sentences (no letters at all, or one
//!    unterminated run longer than a chunk), fall back to fixed character
//!    windows with the same overlap and flag the set as low confidence.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::split;
//!
//! let set = split("doc-1", "Hello world. Second sentence here.", 1000, 0).unwrap();
//! assert_eq!(set.chunks.len(), 1);
//! assert!(!set.low_confidence);
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::RagError;
use crate::models::{Chunk, ChunkSet};
use crate::text::{back_chars, forward_chars};

/// Split raw text into overlapping, sentence-bounded chunks.
///
/// # Errors
///
/// [`RagError::EmptyDocument`] when the text is empty or whitespace only.
///
/// # Guarantees
///
/// - No chunk is empty; indices are contiguous from 0.
/// - Outside low-confidence sets every chunk ends at a sentence end.
/// - Chunks never exceed `target_chars` except for a single oversized
///   sentence.
pub fn split(
    document_id: &str,
    raw_text: &str,
    target_chars: usize,
    overlap_chars: usize,
) -> Result<ChunkSet, RagError> {
    if raw_text.trim().is_empty() {
        return Err(RagError::EmptyDocument);
    }

    let target = target_chars.max(1);
    let overlap = overlap_chars.min(target / 2);

    let seg = segment(raw_text);
    let unsegmentable = !seg.has_letters
        || (seg.terminated == 0 && char_len(raw_text, 0, raw_text.len()) > target);

    let (spans, low_confidence) = if unsegmentable {
        tracing::warn!(
            document_id,
            "no sentence boundaries found, using fixed character windows"
        );
        (window_spans(raw_text, target, overlap), true)
    } else {
        (pack_sentences(raw_text, &seg.spans, target, overlap), false)
    };

    let chunks: Vec<Chunk> = spans
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| make_chunk(document_id, i, raw_text, start, end))
        .collect();

    tracing::debug!(
        document_id,
        chunks = chunks.len(),
        low_confidence,
        "document chunked"
    );

    Ok(ChunkSet {
        chunks,
        low_confidence,
    })
}

struct Segmentation {
    spans: Vec<(usize, usize)>,
    /// Sentences that ended in terminal punctuation.
    terminated: usize,
    has_letters: bool,
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}' | '\u{BB}')
}

fn segment(text: &str) -> Segmentation {
    let mut spans = Vec::new();
    let mut terminated = 0;
    let mut start: Option<usize> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = iter.peek() {
            if is_terminator(next) || is_closer(next) {
                end = j + next.len_utf8();
                iter.next();
            } else {
                break;
            }
        }
        let at_break = iter.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_break {
            if let Some(s) = start.take() {
                spans.push((s, end));
                terminated += 1;
            }
        }
    }

    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            spans.push((s, end));
        }
    }

    let has_letters = spans
        .iter()
        .any(|&(s, e)| text[s..e].chars().any(char::is_alphabetic));

    Segmentation {
        spans,
        terminated,
        has_letters,
    }
}

fn char_len(text: &str, start: usize, end: usize) -> usize {
    text[start..end].chars().count()
}

/// Greedy sentence packing. Returns chunk spans.
fn pack_sentences(
    text: &str,
    sentences: &[(usize, usize)],
    target: usize,
    overlap: usize,
) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut buf: Option<(usize, usize)> = None;

    for &(s, e) in sentences {
        if char_len(text, s, e) > target {
            // Oversized sentence: flush what we have, emit it alone.
            if let Some(b) = buf.take() {
                out.push(b);
            }
            out.push((s, e));
            continue;
        }

        buf = Some(match buf {
            None => match out.last() {
                Some(&(ps, pe)) => (seed_start(text, ps, pe, s, e, target, overlap), e),
                None => (s, e),
            },
            Some((bs, be)) if char_len(text, bs, e) > target => {
                out.push((bs, be));
                (seed_start(text, bs, be, s, e, target, overlap), e)
            }
            Some((bs, _)) => (bs, e),
        });
    }

    if let Some(b) = buf {
        out.push(b);
    }
    out
}

/// Where a new buffer starts: up to `overlap` characters back into the
/// previous chunk, never so far that the new buffer exceeds `target`.
fn seed_start(
    text: &str,
    prev_start: usize,
    prev_end: usize,
    sent_start: usize,
    sent_end: usize,
    target: usize,
    overlap: usize,
) -> usize {
    if overlap == 0 {
        return sent_start;
    }
    let wanted = back_chars(text, prev_end, overlap).max(prev_start);
    let limit = back_chars(text, sent_end, target);
    let mut seed = wanted.max(limit);
    if seed >= sent_start {
        return sent_start;
    }

    // Move off a partial word.
    let mid_word = seed > 0
        && text[..seed]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace())
        && text[seed..].chars().next().is_some_and(|c| !c.is_whitespace());
    if mid_word {
        match text[seed..sent_start].find(char::is_whitespace) {
            Some(off) => seed += off,
            None => return sent_start,
        }
    }

    let lead = text[seed..sent_start].len() - text[seed..sent_start].trim_start().len();
    seed + lead
}

/// Fixed-size character windows, used when sentence segmentation fails.
fn window_spans(text: &str, target: usize, overlap: usize) -> Vec<(usize, usize)> {
    let step = target.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;

    loop {
        let end = forward_chars(text, start, target);
        let piece = &text[start..end];
        if !piece.trim().is_empty() {
            let lead = piece.len() - piece.trim_start().len();
            let trail = piece.len() - piece.trim_end().len();
            out.push((start + lead, end - trail));
        }
        if end >= text.len() {
            break;
        }
        start = forward_chars(text, start, step);
    }
    out
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(document_id: &str, index: usize, raw: &str, start: usize, end: usize) -> Chunk {
    let text = &raw[start..end];
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        sequence_index: index,
        text: text.to_string(),
        source_span: (start, end),
        hash,
    }
}
