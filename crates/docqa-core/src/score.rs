//! Answer quality estimation.
//!
//! Three signals, combined permissively:
//!
//! - **lexical**: share of the query's content words found in the answer
//! - **passage**: share of the query's content words found in any passage
//! - **variant**: a configured term family (`{term: [variants]}`) is
//!   mentioned by the query and one of its surface forms occurs in a passage
//!
//! Any retrieved content biases the result towards [`Tier::Partial`] rather
//! than [`Tier::Ungrounded`]. Thresholds live in [`ScoringParams`].

use std::collections::HashSet;

use crate::answer::is_not_found;
use crate::models::{Chunk, Tier};
use crate::settings::{AnswerParams, ScoringParams};
use crate::text::{contains_phrase, content_words, word_sequence};

/// What the scorer looks at for one question.
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub query: &'a str,
    pub answer: &'a str,
    pub passages: &'a [Chunk],
    /// Chunks came from the fixed-window fallback.
    pub low_confidence: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub lexical: f64,
    pub passage: f64,
    pub variant_match: bool,
    pub not_found: bool,
    pub tier: Tier,
}

pub fn score(ev: &Evidence<'_>, params: &ScoringParams, answer: &AnswerParams) -> ScoreReport {
    let query_words = query_terms(ev.query, params);
    let answer_words = content_words(ev.answer, 0);
    let passage_text: String = ev
        .passages
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let passage_words = content_words(&passage_text, 0);

    let lexical = overlap(&query_words, &answer_words);
    let passage = overlap(&query_words, &passage_words);
    let variant_match = variant_match(ev.query, &passage_text, params);
    let not_found = is_not_found(ev.answer, answer);

    let mut tier = decide(ev.passages.len(), not_found, lexical, passage, variant_match, params);
    if ev.low_confidence && tier == Tier::Grounded {
        tier = Tier::Partial;
    }

    tracing::debug!(
        lexical,
        passage,
        variant_match,
        not_found,
        ?tier,
        "answer scored"
    );

    ScoreReport {
        lexical,
        passage,
        variant_match,
        not_found,
        tier,
    }
}

fn decide(
    passages: usize,
    not_found: bool,
    lexical: f64,
    passage: f64,
    variant_match: bool,
    p: &ScoringParams,
) -> Tier {
    if passages == 0 || (not_found && lexical == 0.0 && passage == 0.0 && !variant_match) {
        return Tier::Ungrounded;
    }
    if variant_match || lexical > p.high_lexical || passage > p.high_passage {
        return Tier::Grounded;
    }
    if lexical > p.low_overlap || passage > p.low_overlap || passages > 0 {
        return Tier::Partial;
    }
    Tier::Ungrounded
}

fn query_terms(query: &str, params: &ScoringParams) -> HashSet<String> {
    let mut words = content_words(query, params.min_word_chars);
    words.retain(|w| !params.stopwords.iter().any(|s| s.eq_ignore_ascii_case(w)));
    words
}

fn overlap(query: &HashSet<String>, against: &HashSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query.iter().filter(|w| against.contains(*w)).count();
    hits as f64 / query.len() as f64
}

/// A family fires when the query and the passages each contain one of its
/// members as whole words. Multi-word members match as phrases.
fn variant_match(query: &str, passages: &str, params: &ScoringParams) -> bool {
    let query = word_sequence(query);
    let passages = word_sequence(passages);
    params.variants.iter().any(|(term, variants)| {
        let family: Vec<Vec<String>> = std::iter::once(term)
            .chain(variants)
            .map(|v| word_sequence(v))
            .filter(|v| !v.is_empty())
            .collect();
        family.iter().any(|v| contains_phrase(&query, v))
            && family.iter().any(|v| contains_phrase(&passages, v))
    })
}
