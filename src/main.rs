//! # docqa CLI
//!
//! Ask questions about a single document from the command line.
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa chunk <file>` | Show how a file is split into passages |
//! | `docqa ask <file> "<question>"` | Answer one question about a file |
//! | `docqa chat <file>` | Interactive session with conversation history |
//!
//! Set `RUST_LOG=debug` to see rewrite decisions and scoring signals.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::{commands, config};

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Adaptive retrieval-augmented question answering over a single document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`. If the file does not exist, built-in
    /// defaults are used and every external service is disabled.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into passages and print them. No services are called.
    Chunk {
        /// PDF, Markdown or plain text file.
        file: PathBuf,
    },

    /// Answer a single question about a file.
    Ask {
        file: PathBuf,
        question: String,
    },

    /// Start an interactive question session about a file.
    ///
    /// Follow-up questions are rewritten using the conversation so far.
    /// Type `exit` to end the session.
    Chat { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docqa::init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Chunk { file } => commands::run_chunk(&cfg, &file)?,
        Commands::Ask { file, question } => commands::run_ask(&cfg, &file, &question).await?,
        Commands::Chat { file } => commands::run_chat(&cfg, &file).await?,
    }

    Ok(())
}
