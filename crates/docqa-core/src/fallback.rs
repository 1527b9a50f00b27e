//! Tiered fallback.
//!
//! | tier       | source             | text                                         |
//! |------------|--------------------|----------------------------------------------|
//! | grounded   | `document`         | grounded answer                              |
//! | partial    | `document_partial` | grounded answer                              |
//! | ungrounded | `not_found`        | grounded attempt, general knowledge, web hits |
//!
//! The ungrounded enrichments are best-effort: a failing generator or web
//! search only removes its own section.

use crate::error::RagError;
use crate::models::{AnswerResult, AnswerSource, Tier, WebResult};
use crate::services::{Generator, WebSearch};
use crate::settings::FallbackParams;
use crate::text::{clip, find_ignore_ascii_case, sentences};

/// Collaborators available to the enrichment steps.
#[derive(Clone, Copy)]
pub struct Enrichers<'a> {
    pub generator: &'a dyn Generator,
    pub web: Option<&'a dyn WebSearch>,
}

/// Turn a scored answer into the final response. Runs once per question.
pub async fn resolve(
    tier: Tier,
    query: &str,
    grounded_answer: &str,
    chunks_used: usize,
    enrichers: Enrichers<'_>,
    params: &FallbackParams,
) -> AnswerResult {
    let (text, source) = match tier {
        Tier::Grounded => (grounded_answer.trim().to_string(), AnswerSource::Document),
        Tier::Partial => (grounded_answer.trim().to_string(), AnswerSource::DocumentPartial),
        Tier::Ungrounded => (
            compose_not_found(query, grounded_answer, enrichers, params).await,
            AnswerSource::NotFound,
        ),
    };

    AnswerResult {
        text,
        tier,
        chunks_used,
        source,
    }
}

async fn compose_not_found(
    query: &str,
    grounded_answer: &str,
    enrichers: Enrichers<'_>,
    params: &FallbackParams,
) -> String {
    let mut sections = Vec::new();
    if !grounded_answer.trim().is_empty() {
        sections.push(grounded_answer.trim().to_string());
    }

    if params.general_knowledge {
        if let Some(general) = general_knowledge(enrichers.generator, query, params).await {
            sections.push(format!("{}\n{}", params.general_header, general));
        }
    }

    if params.web_search {
        match enrichers.web {
            Some(web) => match web.search_web(query, params.web_max_results).await {
                Ok(results) if !results.is_empty() => {
                    sections.push(format!(
                        "{}\n{}",
                        params.web_header,
                        format_web_results(&results, params.snippet_chars)
                    ));
                }
                Ok(_) => tracing::debug!("web search returned nothing"),
                Err(e) => {
                    let e = RagError::from_collaborator(e, RagError::SearchUnavailable);
                    tracing::warn!(error = %e, "skipping web results");
                }
            },
            None => tracing::debug!("no web search configured"),
        }
    }

    sections.join("\n\n")
}

/// Answer from the model's own knowledge with grounding disclaimers removed.
async fn general_knowledge(
    generator: &dyn Generator,
    query: &str,
    params: &FallbackParams,
) -> Option<String> {
    let prompt = format!(
        "Answer the following question from your general knowledge. \
         Be accurate and concise, at most three sentences.\n\n\
         Question: {}\nAnswer:",
        query.trim()
    );
    match generator
        .generate(&prompt, params.max_tokens, params.temperature)
        .await
    {
        Ok(raw) => {
            let cleaned = strip_boilerplate(&raw, &params.boilerplate_markers);
            (!cleaned.is_empty()).then_some(cleaned)
        }
        Err(e) => {
            let e = RagError::from_collaborator(e, RagError::GenerationFailure);
            tracing::warn!(error = %e, "skipping general knowledge answer");
            None
        }
    }
}

/// Drop every sentence that mentions one of `markers`.
pub fn strip_boilerplate(text: &str, markers: &[String]) -> String {
    sentences(text)
        .into_iter()
        .filter(|s| {
            !markers
                .iter()
                .any(|m| !m.is_empty() && find_ignore_ascii_case(s, m).is_some())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One block per result: title, clipped snippet, link.
pub fn format_web_results(results: &[WebResult], snippet_chars: usize) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "\u{1F4C4} {}\n{}\n\u{1F517} {}",
                r.title.trim(),
                clip(&r.snippet, snippet_chars),
                r.url.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
