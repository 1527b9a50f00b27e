//! In-process fakes for unit tests.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::models::WebResult;
use crate::services::{Generator, WebSearch};

const DIMS: usize = 1024;

/// Deterministic bag-of-words embedder (FNV-1a hashed word counts).
pub struct WordEmbedder;

pub fn word_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    fn model_name(&self) -> &str {
        "test/words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| word_vector(t)).collect())
    }
}

/// Fails any call that includes a text containing `poison`.
pub struct FlakyEmbedder {
    poison: String,
}

impl FlakyEmbedder {
    pub fn new(poison: &str) -> Self {
        Self {
            poison: poison.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn model_name(&self) -> &str {
        "test/flaky"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains(&self.poison)) {
            bail!("upstream rejected input");
        }
        Ok(texts.iter().map(|t| word_vector(t)).collect())
    }
}

type Script = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Generator driven by a closure over the prompt; records every prompt.
pub struct ScriptedGenerator {
    script: Script,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| bail!("model overloaded"))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "test/scripted"
    }
    async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.script)(prompt)
    }
}

/// Web search returning canned results, or failing.
pub struct CannedWeb {
    pub results: Option<Vec<WebResult>>,
}

#[async_trait]
impl WebSearch for CannedWeb {
    async fn search_web(&self, _query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        match &self.results {
            Some(r) => Ok(r.iter().take(max_results).cloned().collect()),
            None => bail!("search backend down"),
        }
    }
}
