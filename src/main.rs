//! # Raggedy CLI
//!
//! Thin caller over the library: wires configuration into the pipeline and
//! exposes one command per inbound operation.
//!
//! ## Usage
//!
//! ```bash
//! raggedy --config ./config/raggedy.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `raggedy ask "<prompt>"` | One-shot question against a fresh session |
//! | `raggedy chat` | Interactive session on stdin |
//! | `raggedy refresh` | Invalidate the index cache and rebuild now |
//! | `raggedy status` | Show the cached index without rebuilding |

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use raggedy::chat::HttpChatClient;
use raggedy::config::{load_config, Config};
use raggedy::embedding::HttpEmbedder;
use raggedy::index::IndexCache;
use raggedy::session::{ChatPipeline, Session};
use raggedy::source::create_source;

/// Raggedy — retrieval-augmented chat over a document tree.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the source, embedding, chat, index, and retrieval settings.
#[derive(Parser)]
#[command(
    name = "raggedy",
    about = "Retrieval-augmented chat over a document tree",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/raggedy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply.
    Ask {
        /// The question to ask.
        prompt: String,
    },

    /// Start an interactive chat session on stdin.
    Chat,

    /// Invalidate the index cache and rebuild it now.
    Refresh,

    /// Show the cached index (document count and age) without rebuilding.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("raggedy=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let (pipeline, cache) = build_pipeline(&config)?;

    match cli.command {
        Commands::Ask { prompt } => {
            let mut session = Session::new();
            let reply = pipeline.submit(&mut session, &prompt).await;
            println!("{}", reply.content);
        }
        Commands::Chat => {
            run_chat_loop(&pipeline).await?;
        }
        Commands::Refresh => {
            let index = cache.refresh().await?;
            println!(
                "index rebuilt: {} documents ({} dims)",
                index.document_count(),
                index.dims()
            );
        }
        Commands::Status => match cache.snapshot() {
            Some(index) => println!(
                "index: {} documents, built {}s ago",
                index.document_count(),
                index.built_at().elapsed().as_secs()
            ),
            None => println!("index: not built yet"),
        },
    }

    Ok(())
}

/// Wire config into the component graph. The cache handle is returned
/// alongside the pipeline so `refresh`/`status` can reach it directly.
fn build_pipeline(config: &Config) -> Result<(ChatPipeline, IndexCache)> {
    let source = create_source(&config.source)?;
    let embedder: Arc<HttpEmbedder> = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let chat = Arc::new(HttpChatClient::new(&config.chat)?);

    let cache = IndexCache::new(
        source,
        embedder.clone(),
        &config.source.root,
        Duration::from_secs(config.index.ttl_secs),
    );

    let pipeline = ChatPipeline::new(cache.clone(), embedder, chat, config);
    Ok((pipeline, cache))
}

async fn run_chat_loop(pipeline: &ChatPipeline) -> Result<()> {
    let mut session = Session::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("raggedy chat — empty line or Ctrl-D to exit");
    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let reply = pipeline.submit(&mut session, line).await;
        println!("assistant> {}\n", reply.content);
    }

    Ok(())
}
