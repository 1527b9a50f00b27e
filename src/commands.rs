//! Implementations of the `docqa` subcommands.
//!
//! Answers go to stdout; diagnostics go through `tracing` to stderr.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use docqa_core::chunk;
use docqa_core::models::{AnswerResult, ConversationHistory};

use crate::config::Config;
use crate::extract::load_file;
use crate::library::{Library, UploadSummary};

/// Owner id used for the single local session.
const LOCAL_OWNER: &str = "local";

/// Print how a file would be chunked, without embedding anything.
pub fn run_chunk(config: &Config, path: &Path) -> Result<()> {
    let source = load_file(path)?;
    let set = chunk::split(
        &source.name,
        &source.raw_text,
        config.chunking.target_chars,
        config.chunking.overlap_chars,
    )?;

    println!(
        "{} chunks{}",
        set.chunks.len(),
        if set.low_confidence {
            " (low confidence: fixed windows)"
        } else {
            ""
        }
    );
    for c in &set.chunks {
        let first_line: String = c.text.chars().take(72).collect();
        println!(
            "[{:>3}] {:>7}..{:<7} {:>5} chars  {}",
            c.sequence_index,
            c.source_span.0,
            c.source_span.1,
            c.text.chars().count(),
            first_line.replace('\n', " ")
        );
    }
    Ok(())
}

/// Answer one question about a file.
pub async fn run_ask(config: &Config, path: &Path, question: &str) -> Result<()> {
    let library = Library::from_config(config)?;
    let summary = upload(&library, path).await?;
    report_upload(&summary);

    let mut history = ConversationHistory::new();
    let result = library.ask(LOCAL_OWNER, &mut history, question).await?;
    print_answer(&result);
    Ok(())
}

/// Interactive session over stdin. `exit` ends it and removes the document.
pub async fn run_chat(config: &Config, path: &Path) -> Result<()> {
    let library = Library::from_config(config)?;
    let summary = upload(&library, path).await?;
    report_upload(&summary);
    println!("Ask about the document. Type `exit` to quit.");

    let mut history = ConversationHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            break;
        }

        let result = library.ask(LOCAL_OWNER, &mut history, line).await?;
        print_answer(&result);
    }

    library.remove(LOCAL_OWNER).await;
    Ok(())
}

async fn upload(library: &Library, path: &Path) -> Result<UploadSummary> {
    let source = load_file(path)?;
    library
        .upload(LOCAL_OWNER, source)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn report_upload(summary: &UploadSummary) {
    if let Some(title) = &summary.metadata.title {
        eprintln!("Title:   {}", title);
    }
    if let Some(authors) = &summary.metadata.authors {
        eprintln!("Authors: {}", authors);
    }
    if let Some(id) = &summary.metadata.arxiv_id {
        eprintln!("arXiv:   {}", id);
    }
    eprintln!(
        "Indexed {}/{} chunks{}",
        summary.indexed,
        summary.chunks,
        if summary.low_confidence {
            " (low confidence)"
        } else {
            ""
        }
    );
    if !summary.dropped.is_empty() {
        eprintln!("Dropped chunks: {:?}", summary.dropped);
    }
}

fn print_answer(result: &AnswerResult) {
    println!("{}", result.text);
    println!(
        "  [{} | {:?} | {} passages]",
        result.source, result.tier, result.chunks_used
    );
}
