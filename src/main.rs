//! finrag CLI
//!
//! Retrieval-augmented question answering over financial documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finrag::{
    chunker::ChunkConfig,
    config::Config,
    embeddings::EmbeddingModel,
    ingest::ingest_tatqa,
    llm::{AnswerGenerator, LlmClient},
    index::VectorStore,
    retriever::Retriever,
};
use std::path::PathBuf;
use std::time::Instant;

/// finrag - retrieval-augmented QA over financial documents
#[derive(Parser)]
#[command(name = "finrag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and index a TAT-QA dataset file
    Ingest {
        /// Path to the TAT-QA JSON dataset
        dataset: PathBuf,

        /// Directory where the index is persisted
        #[arg(short, long)]
        index_dir: Option<PathBuf>,

        /// Collection name
        #[arg(short, long)]
        collection: Option<String>,

        /// Maximum words per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared between adjacent chunks
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Answer a question from the indexed corpus
    Query {
        /// The question to answer
        question: String,

        /// Directory where the index is persisted
        #[arg(short, long)]
        index_dir: Option<PathBuf>,

        /// Collection name
        #[arg(short, long)]
        collection: Option<String>,

        /// Number of candidates scanned in the index
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Number of chunks included in the generation context
        #[arg(short, long)]
        return_k: Option<usize>,

        /// Print the retrieved chunks instead of calling the LLM
        #[arg(long)]
        retrieve_only: bool,
    },

    /// Show information about a built collection
    Info {
        /// Directory where the index is persisted
        #[arg(short, long)]
        index_dir: Option<PathBuf>,

        /// Collection name
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            dataset,
            index_dir,
            collection,
            chunk_size,
            overlap,
        } => cmd_ingest(dataset, index_dir, collection, chunk_size, overlap),
        Commands::Query {
            question,
            index_dir,
            collection,
            top_k,
            return_k,
            retrieve_only,
        } => cmd_query(question, index_dir, collection, top_k, return_k, retrieve_only).await,
        Commands::Info {
            index_dir,
            collection,
        } => cmd_info(index_dir, collection),
        Commands::Test => cmd_test().await,
    }
}

/// Apply CLI overrides on top of the loaded configuration.
fn load_config(index_dir: Option<PathBuf>, collection: Option<String>) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = index_dir {
        config.retrieval.index_dir = dir;
    }
    if let Some(name) = collection {
        config.retrieval.collection = name;
    }
    Ok(config)
}

fn cmd_ingest(
    dataset: PathBuf,
    index_dir: Option<PathBuf>,
    collection: Option<String>,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let mut config = load_config(index_dir, collection)?;
    if let Some(size) = chunk_size {
        config.retrieval.chunk_size_tokens = size;
    }
    if let Some(overlap) = overlap {
        config.retrieval.overlap_tokens = overlap;
    }
    config
        .validate_retrieval()
        .context("Invalid retrieval configuration")?;

    println!("Loading embedding model (all-MiniLM-L6-v2)...");
    let embedder = EmbeddingModel::load_minilm().context("Failed to load embedding model")?;

    println!("Ingesting dataset: {}", dataset.display());
    let start = Instant::now();

    let store = VectorStore::open(&config.retrieval.index_dir)
        .context("Failed to open vector store")?;
    let chunk_config = ChunkConfig {
        chunk_size_tokens: config.retrieval.chunk_size_tokens,
        overlap_tokens: config.retrieval.overlap_tokens,
    };

    let stats = ingest_tatqa(
        &dataset,
        &embedder,
        &store,
        &config.retrieval.collection,
        &chunk_config,
    )
    .context("Ingestion failed")?;

    println!("\nIngestion complete:");
    println!("  Documents:   {}", stats.documents);
    println!("  Chunks:      {}", stats.chunks);
    println!("  Collection:  {}", config.retrieval.collection);
    println!(
        "  Index file:  {}",
        store.collection_path(&config.retrieval.collection).display()
    );
    println!("  Time:        {:.2?}", start.elapsed());

    Ok(())
}

async fn cmd_query(
    question: String,
    index_dir: Option<PathBuf>,
    collection: Option<String>,
    top_k: Option<usize>,
    return_k: Option<usize>,
    retrieve_only: bool,
) -> Result<()> {
    let mut config = load_config(index_dir, collection)?;
    if let Some(k) = top_k {
        config.retrieval.top_k = k;
    }
    if let Some(k) = return_k {
        config.retrieval.return_k = k;
    }
    config
        .validate_retrieval()
        .context("Invalid retrieval configuration")?;

    let store = VectorStore::open(&config.retrieval.index_dir)
        .context("Failed to open vector store")?;
    if !store.exists(&config.retrieval.collection) {
        anyhow::bail!(
            "Collection '{}' not found in '{}'. Run 'ingest' first.",
            config.retrieval.collection,
            config.retrieval.index_dir.display()
        );
    }
    let loaded = store
        .load(&config.retrieval.collection)
        .context("Failed to load collection")?;

    println!("Loading embedding model (all-MiniLM-L6-v2)...");
    let embedder = EmbeddingModel::load_minilm().context("Failed to load embedding model")?;
    let retriever = Retriever::new(&embedder, &loaded);

    let start = Instant::now();
    let results = retriever
        .retrieve(&question, config.retrieval.top_k, config.retrieval.return_k)
        .context("Retrieval failed")?;

    if results.is_empty() {
        println!("No chunks retrieved; the collection may be empty.");
        return Ok(());
    }

    println!("Retrieved chunks:");
    for (i, chunk) in results.iter().enumerate() {
        println!("{:>2}. [{}] (score {:.4})", i + 1, chunk.chunk_id, chunk.score);
        println!("    {}", chunk.text);
    }

    if retrieve_only {
        println!("\nRetrieved {} chunks in {:.2?}", results.len(), start.elapsed());
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;
    let client = LlmClient::new(config.llm);

    let context = results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    println!("\nGenerating answer with {} chunks of context...", results.len());
    let answer = client
        .generate(&question, &context)
        .await
        .context("Answer generation failed")?;

    println!("\nAnswer: {}", answer);
    println!("\nTotal time: {:.2?}", start.elapsed());

    Ok(())
}

fn cmd_info(index_dir: Option<PathBuf>, collection: Option<String>) -> Result<()> {
    let config = load_config(index_dir, collection)?;

    let store = VectorStore::open(&config.retrieval.index_dir)
        .context("Failed to open vector store")?;
    if !store.exists(&config.retrieval.collection) {
        anyhow::bail!(
            "Collection '{}' not found in '{}'. Run 'ingest' first.",
            config.retrieval.collection,
            config.retrieval.index_dir.display()
        );
    }

    let loaded = store
        .load(&config.retrieval.collection)
        .context("Failed to load collection")?;
    let path = store.collection_path(&config.retrieval.collection);
    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    println!("Collection Information");
    println!("{}", "─".repeat(40));
    println!("  Name:        {}", loaded.name);
    println!("  Entries:     {}", loaded.len());
    if let Some(entry) = loaded.entries.first() {
        println!("  Dimensions:  {}", entry.embedding.len());
    }
    println!("  File size:   {:.1} KB", size as f64 / 1024.0);
    println!("  Index path:  {}", path.display());

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        &config.llm.api_key[..config.llm.api_key.len().min(8)]
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
