//! Deterministic in-process collaborators for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use docqa::library::Library;
use docqa_core::embedding::EmbeddingProvider;
use docqa_core::models::WebResult;
use docqa_core::pipeline::Pipeline;
use docqa_core::services::{Generator, WebSearch};
use docqa_core::settings::PipelineParams;

const DIMS: usize = 512;

/// Hashed bag-of-words vectors.
pub struct BagOfWords;

#[async_trait]
impl EmbeddingProvider for BagOfWords {
    fn model_name(&self) -> &str {
        "fake/bag-of-words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vectorize(t)).collect())
    }
}

fn vectorize(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        let h = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| {
                (h ^ b as u64).wrapping_mul(0x100000001b3)
            });
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}

/// Answers with the first sentence of the context it was given, or the
/// sentinel when there is none. General-knowledge prompts get `general`.
pub struct EchoGenerator {
    pub general: String,
    pub prompts: Mutex<Vec<String>>,
    /// When set, grounded answering waits for `release` after signalling
    /// `started`.
    pub gate: Option<Gate>,
    /// Answer every grounded prompt with "I don't know".
    pub refuse: bool,
}

#[derive(Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl EchoGenerator {
    pub fn new(general: &str) -> Self {
        Self {
            general: general.to_string(),
            prompts: Mutex::new(Vec::new()),
            gate: None,
            refuse: false,
        }
    }

    pub fn refusing(general: &str) -> Self {
        Self {
            refuse: true,
            ..Self::new(general)
        }
    }

    pub fn gated(gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new("")
        }
    }

    pub fn grounded_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("Context:\n"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "fake/echo"
    }

    async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(context) = prompt
            .split_once("Context:\n")
            .and_then(|(_, rest)| rest.split_once("\n\nQuestion:"))
            .map(|(context, _)| context.to_string())
        {
            if let Some(gate) = &self.gate {
                gate.started.notify_one();
                gate.release.notified().await;
            }
            if self.refuse {
                return Ok("I don't know".to_string());
            }
            let first = context
                .split_inclusive(". ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            return Ok(first);
        }
        if prompt.contains("general knowledge") {
            if self.general.is_empty() {
                bail!("no general knowledge configured");
            }
            return Ok(self.general.clone());
        }
        // Rewrite requests: echo the follow-up unchanged.
        Ok(prompt
            .rsplit_once("Follow-up: ")
            .and_then(|(_, rest)| rest.split_once('\n'))
            .map(|(q, _)| q.to_string())
            .unwrap_or_default())
    }
}

pub struct StaticWeb(pub Vec<WebResult>);

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search_web(&self, _query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        Ok(self.0.iter().take(max_results).cloned().collect())
    }
}

pub fn library(generator: Arc<EchoGenerator>, web: Option<Arc<dyn WebSearch>>) -> Library {
    Library::new(Pipeline::new(
        Arc::new(BagOfWords),
        generator,
        web,
        PipelineParams::default(),
    ))
}

pub const BAGGING: &str = "Bagging trains models on bootstrap samples. \
    Boosting trains models sequentially, each correcting the prior's errors.";

pub const KUBERNETES: &str = "Kubernetes schedules containers across a cluster of nodes. \
    A pod is the smallest deployable unit.";
