//! # Chronicle CLI (`chron`)
//!
//! The `chron` binary drives the offline build job and offers an ad-hoc
//! retrieval check. The online retrieval path is a library call
//! ([`chronicle::retriever::Retriever`]) made from whatever service
//! boundary hosts it; no server lives here.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chron build` | One-shot batch job: chunk and embed the corpus, build the flat index, upload both artifacts |
//! | `chron query "<question>"` | Load the artifacts and print the retrieved context |
//!
//! ## Examples
//!
//! ```bash
//! chron --config ./config/chronicle.toml build
//! chron --config ./config/chronicle.toml query "Siapa presiden pertama Indonesia?"
//! chron query "Siapa presiden pertama Indonesia?" --top-k 1 --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use chronicle::builder::run_build;
use chronicle::config::load_config;
use chronicle::embedding::HttpEmbedder;
use chronicle::retriever::Retriever;
use chronicle::storage::S3BlobStore;
use chronicle_core::search::compose_context;

/// Chronicle — corpus retrieval for historical question answering.
#[derive(Parser)]
#[command(
    name = "chron",
    about = "Chronicle — corpus retrieval for historical question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chronicle.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index and chunk mapping from the corpus blob
    /// and upload both artifacts.
    ///
    /// Batch and non-incremental: the full corpus is re-chunked and
    /// re-embedded on every run. Running retrievers pick the new
    /// artifacts up on their next process start.
    Build,

    /// Retrieve the context block for a question.
    Query {
        /// The question to retrieve context for.
        question: String,

        /// Number of nearest passages to retrieve (defaults to
        /// `retrieval.top_k` from the config).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print passages as JSON with chunk ids and distances.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let store = Arc::new(S3BlobStore::new(&config.storage)?);
    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);

    match cli.command {
        Commands::Build => {
            let summary = run_build(&config, store.as_ref(), embedder.as_ref()).await?;
            println!("build {}", config.storage.bucket);
            println!("  chunks: {}", summary.chunks);
            println!("  dimension: {}", summary.dims);
            println!(
                "  uploaded: {}, {}",
                summary.index_object, summary.mapping_object
            );
            println!("ok");
        }
        Commands::Query {
            question,
            top_k,
            json,
        } => {
            let retriever = Retriever::new(&config, store, embedder);
            let k = top_k.unwrap_or_else(|| retriever.top_k());
            let passages = retriever.retrieve_passages(&question, k).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&passages)?);
            } else if passages.is_empty() {
                eprintln!("(no context retrieved)");
            } else {
                println!("{}", compose_context(&passages));
            }
        }
    }

    Ok(())
}
