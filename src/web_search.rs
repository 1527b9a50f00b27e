//! Web search adapter (Tavily).
//!
//! Web search is optional. A disabled provider or a missing API key means
//! there is no collaborator at all, so the fallback simply skips the web
//! tier.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use docqa_core::models::WebResult;
use docqa_core::services::WebSearch;

use crate::config::WebSearchConfig;
use crate::http;

const TAVILY_URL: &str = "https://api.tavily.com";

pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let api_key = http::api_key(&config.api_key_env)?;
        let base = config.url.as_deref().unwrap_or(TAVILY_URL);
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: format!("{}/search", base.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search_web(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
        });
        // One attempt: this tier is best-effort and already under a deadline.
        let json = http::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            0,
            "Tavily",
        )
        .await?;
        parse_tavily_response(&json)
    }
}

fn parse_tavily_response(json: &serde_json::Value) -> Result<Vec<WebResult>> {
    let results = json
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow!("Invalid Tavily response: missing results array"))?;

    Ok(results
        .iter()
        .filter_map(|r| {
            let url = r.get("url")?.as_str()?.to_string();
            let field = |name: &str| {
                r.get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let title = field("title");
            Some(WebResult {
                title: if title.trim().is_empty() {
                    "Untitled".to_string()
                } else {
                    title
                },
                url,
                snippet: field("content"),
            })
        })
        .collect())
}

/// Create the configured web search collaborator, or `None` when there is
/// none to use.
pub fn create_web_search(config: &WebSearchConfig) -> Result<Option<Arc<dyn WebSearch>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "tavily" => match TavilySearch::new(config) {
            Ok(search) => Ok(Some(Arc::new(search))),
            Err(e) => {
                tracing::warn!(error = %e, "web search disabled");
                Ok(None)
            }
        },
        other => bail!("Unknown web search provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tavily_results_are_mapped() {
        let json = serde_json::json!({
            "query": "bagging",
            "results": [
                {"title": "Bootstrap aggregating", "url": "https://en.wikipedia.org/wiki/Bootstrap_aggregating", "content": "Bagging is an ensemble meta-algorithm.", "score": 0.9},
                {"url": "https://example.org", "content": "No title here."},
                {"title": "No url"}
            ]
        });
        let results = parse_tavily_response(&json).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Bootstrap aggregating");
        assert_eq!(results[0].snippet, "Bagging is an ensemble meta-algorithm.");
        assert_eq!(results[1].title, "Untitled");
    }

    #[test]
    fn test_missing_key_means_no_collaborator() {
        let config = WebSearchConfig {
            provider: "tavily".to_string(),
            api_key_env: "DOCQA_TEST_UNSET_TAVILY_KEY".to_string(),
            ..Default::default()
        };
        assert!(create_web_search(&config).unwrap().is_none());
        assert!(create_web_search(&WebSearchConfig::default()).unwrap().is_none());
    }
}
