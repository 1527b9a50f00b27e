//! TOML configuration.
//!
//! Pipeline tuning sections (`[chunking]`, `[retrieval]`, `[rewrite]`,
//! `[answer]`, `[scoring]`, `[fallback]`) deserialize straight into the
//! core parameter structs; the collaborator sections (`[embedding]`,
//! `[generation]`, `[web_search]`) are defined here. Every field has a
//! default, so an empty file is a valid (if offline) configuration.
//!
//! ```toml
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [generation]
//! provider = "openai"
//! url = "https://openrouter.ai/api/v1"
//! model = "openai/gpt-4o-mini"
//! api_key_env = "OPENROUTER_API_KEY"
//!
//! [scoring.variants]
//! transformer = ["transformers", "трансформер"]
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use docqa_core::settings::{
    AnswerParams, ChunkParams, FallbackParams, PipelineParams, RetrievalParams, RewriteParams,
    ScoringParams,
};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkParams,
    pub retrieval: RetrievalParams,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub web_search: WebSearchConfig,
    pub rewrite: RewriteParams,
    pub answer: AnswerParams,
    pub scoring: ScoringParams,
    pub fallback: FallbackParams,
}

impl Config {
    /// Defaults for everything; collaborators disabled.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// The core pipeline's view of this config.
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            chunking: self.chunking.clone(),
            retrieval: self.retrieval.clone(),
            rewrite: self.rewrite.clone(),
            answer: self.answer.clone(),
            scoring: self.scoring.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `disabled`, `openai`, `ollama` or `local`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible gateways, remote Ollama).
    pub url: Option<String>,
    pub api_key_env: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `disabled`, `openai` or `ollama`.
    pub provider: String,
    pub model: Option<String>,
    pub url: Option<String>,
    pub api_key_env: String,
    /// Upper bound applied to every stage's own `max_tokens`.
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 500,
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebSearchConfig {
    /// `disabled` or `tavily`.
    pub provider: String,
    pub url: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            url: None,
            api_key_env: "TAVILY_API_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields [`Config::minimal`].
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.target_chars == 0 {
        bail!("chunking.target_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.target_chars {
        bail!("chunking.overlap_chars must be smaller than chunking.target_chars");
    }

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.batch_size == 0 {
        bail!("retrieval.batch_size must be >= 1");
    }

    let s = &config.scoring;
    for (name, value) in [
        ("scoring.high_lexical", s.high_lexical),
        ("scoring.high_passage", s.high_passage),
        ("scoring.low_overlap", s.low_overlap),
        ("rewrite.min_grounded_ratio", config.rewrite.min_grounded_ratio),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{} must be in [0.0, 1.0]", name);
        }
    }
    if s.low_overlap > s.high_lexical || s.low_overlap > s.high_passage {
        bail!("scoring.low_overlap must not exceed the high thresholds");
    }

    if config.answer.not_found_phrases.iter().all(|p| p.trim().is_empty()) {
        bail!("answer.not_found_phrases must contain at least one phrase");
    }

    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    match config.generation.provider.as_str() {
        "disabled" => {}
        "openai" | "ollama" => {
            if config.generation.model.is_none() {
                bail!(
                    "generation.model must be specified when provider is '{}'",
                    config.generation.provider
                );
            }
        }
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    match config.web_search.provider.as_str() {
        "disabled" | "tavily" => {}
        other => bail!(
            "Unknown web search provider: '{}'. Must be disabled or tavily.",
            other
        ),
    }

    Ok(())
}
