//! # docqa
//!
//! Host application for the `docqa-core` question-answering pipeline: TOML
//! configuration, HTTP-backed collaborators with retry and per-call
//! deadlines, text extraction for uploaded files, and the per-owner
//! document [`library`].
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │  extract   │──▶│   Library    │──▶│ docqa-core Pipeline      │
//! │ PDF / text │   │ per owner    │   │ chunk, index, rewrite,   │
//! └────────────┘   │ RwLock slot  │   │ answer, score, fallback  │
//!                  └──────────────┘   └────────────┬─────────────┘
//!                                                  │ Timed<…>
//!                         ┌────────────────────────┼──────────────┐
//!                         ▼                        ▼              ▼
//!                    embeddings              generation      web search
//!                 OpenAI/Ollama/local       OpenAI/Ollama      Tavily
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`embedding`] | Embedding service adapters |
//! | [`generation`] | Text generation adapters |
//! | [`web_search`] | Web search adapter |
//! | [`timeout`] | Per-call deadlines |
//! | [`extract`] | PDF and text extraction |
//! | [`library`] | Per-owner document registry |
//! | [`commands`] | CLI subcommands |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod library;
pub mod timeout;
pub mod web_search;

/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
