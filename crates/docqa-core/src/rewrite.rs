//! Conversational query rewriting.
//!
//! Turns the latest utterance of a conversation into a standalone retrieval
//! query. Single questions pass through untouched; acknowledgements ("yes",
//! "ok") are replaced by the last substantive user question; anything else
//! is rewritten by the generator and accepted only if the rewrite stays
//! within the vocabulary of the conversation.

use crate::models::{ConversationTurn, Role};
use crate::services::Generator;
use crate::settings::RewriteParams;
use crate::text::{clip, content_words};

/// How a standalone query was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    Passthrough,
    /// Short acknowledgement replaced by an earlier user question.
    Acknowledgement,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneQuery {
    pub text: String,
    pub origin: QueryOrigin,
}

impl StandaloneQuery {
    fn passthrough(latest: &str) -> Self {
        Self {
            text: latest.trim().to_string(),
            origin: QueryOrigin::Passthrough,
        }
    }
}

const TURN_CLIP_CHARS: usize = 500;

/// Rewrite `latest` against the prior turns in `history`.
///
/// Never fails: every failure path returns the passthrough query.
pub async fn rewrite(
    generator: &dyn Generator,
    history: &[ConversationTurn],
    latest: &str,
    params: &RewriteParams,
) -> StandaloneQuery {
    if history.len() <= 1 {
        return StandaloneQuery::passthrough(latest);
    }

    if latest.trim().chars().count() <= params.short_query_max_chars {
        return match last_substantive_question(history, params.short_query_max_chars) {
            Some(q) => {
                tracing::debug!(query = q, "acknowledgement replaced by earlier question");
                StandaloneQuery {
                    text: q.to_string(),
                    origin: QueryOrigin::Acknowledgement,
                }
            }
            None => StandaloneQuery::passthrough(latest),
        };
    }

    if !params.enabled {
        return StandaloneQuery::passthrough(latest);
    }

    let window = &history[history.len().saturating_sub(params.history_window)..];
    let prompt = rewrite_prompt(window, latest);

    let raw = match generator
        .generate(&prompt, params.max_tokens, params.temperature)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "query rewrite failed, using original question");
            return StandaloneQuery::passthrough(latest);
        }
    };

    let candidate = clean_rewrite(&raw);
    if candidate.is_empty() {
        return StandaloneQuery::passthrough(latest);
    }

    if !is_grounded_rewrite(&candidate, history, latest, params) {
        tracing::debug!(rewrite = %candidate, "rewrite introduces new vocabulary, discarded");
        return StandaloneQuery::passthrough(latest);
    }

    StandaloneQuery {
        text: candidate,
        origin: QueryOrigin::Generated,
    }
}

fn last_substantive_question(history: &[ConversationTurn], short_max: usize) -> Option<&str> {
    history
        .iter()
        .rev()
        .filter(|t| t.role == Role::User)
        .map(|t| t.content.trim())
        .find(|c| c.chars().count() > short_max)
}

fn rewrite_prompt(window: &[ConversationTurn], latest: &str) -> String {
    let mut convo = String::new();
    for turn in window {
        let who = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        convo.push_str(&format!("{}: {}\n", who, clip(&turn.content, TURN_CLIP_CHARS)));
    }

    format!(
        "Given the conversation below and a follow-up message, rewrite the follow-up \
         as one standalone question that can be understood without the conversation. \
         Replace pronouns and vague references with what they refer to. \
         Do not add topics that do not appear in the conversation. \
         Reply with the question only.\n\n\
         Conversation:\n{}\nFollow-up: {}\nStandalone question:",
        convo,
        latest.trim()
    )
}

/// First non-empty line, without labels or surrounding quotes.
fn clean_rewrite(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let lower = line.to_lowercase();
    let line = ["standalone question:", "question:", "rewritten question:"]
        .iter()
        .find(|p| lower.starts_with(*p))
        .and_then(|p| line.get(p.len()..))
        .map(str::trim)
        .unwrap_or(line);
    line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '\u{201C}' | '\u{201D}'))
        .trim()
        .to_string()
}

fn is_grounded_rewrite(
    candidate: &str,
    history: &[ConversationTurn],
    latest: &str,
    params: &RewriteParams,
) -> bool {
    let words = content_words(candidate, 3);
    if words.is_empty() {
        return false;
    }
    let mut convo = content_words(latest, 3);
    for turn in history {
        convo.extend(content_words(&turn.content, 3));
    }
    let known = words.iter().filter(|w| convo.contains(*w)).count();
    known as f64 / words.len() as f64 >= params.min_grounded_ratio
}
