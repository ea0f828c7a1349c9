//! Evaluation CLI: score retrieval and generation quality over a dataset.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finrag::{
    chunker::ChunkConfig,
    config::Config,
    embeddings::EmbeddingModel,
    eval::{
        EvalDataset, EvaluationConfig, RelevancePolicy, create_sample_dataset, load_tatqa_dataset,
        run_evaluation,
    },
    index::VectorStore,
    ingest::ingest_corpus,
    llm::LlmClient,
};
use std::path::PathBuf;

/// finrag evaluation harness
#[derive(Parser)]
#[command(name = "eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Maximum samples scored by the retrieval evaluator
    #[arg(long, global = true, default_value_t = 50)]
    retrieval_samples: usize,

    /// Maximum samples scored end to end by the generation evaluator
    #[arg(long, global = true, default_value_t = 20)]
    generation_samples: usize,

    /// Number of retrieved chunks scored per query
    #[arg(short = 'k', long, global = true, default_value_t = 2)]
    top_k: usize,

    /// Where to write the JSON report
    #[arg(short, long, global = true, default_value = "data/eval_report.json")]
    output: PathBuf,

    /// Skip the generation evaluator (no LLM calls)
    #[arg(long, global = true)]
    retrieval_only: bool,

    /// Print per-sample generation details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate on the small built-in dataset
    Sample,

    /// Evaluate on a TAT-QA JSON dataset file
    Tatqa {
        /// Path to the TAT-QA JSON dataset
        dataset: PathBuf,
    },

    /// Evaluate on a custom JSON dataset (finrag's own format)
    Custom {
        /// Path to the dataset JSON file
        dataset: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dataset = match &cli.command {
        Commands::Sample => create_sample_dataset(),
        Commands::Tatqa { dataset } => {
            load_tatqa_dataset(dataset).context("Failed to load TAT-QA dataset")?
        }
        Commands::Custom { dataset } => {
            EvalDataset::load_json(dataset).context("Failed to load dataset")?
        }
    };

    if dataset.is_empty() {
        anyhow::bail!("Dataset '{}' has no usable samples", dataset.name);
    }
    println!(
        "Dataset: {} ({} samples, {} source documents)",
        dataset.name,
        dataset.len(),
        dataset.sources.len()
    );

    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate_retrieval()
        .context("Invalid retrieval configuration")?;
    if !cli.retrieval_only {
        config.validate().context("Invalid configuration")?;
    }

    println!("Loading embedding model (all-MiniLM-L6-v2)...");
    let embedder = EmbeddingModel::load_minilm().context("Failed to load embedding model")?;

    // Build a fresh collection from the dataset's own source documents so
    // the evaluation never depends on a previously ingested corpus.
    println!("Indexing {} source documents...", dataset.sources.len());
    let store = VectorStore::open(&config.retrieval.index_dir)
        .context("Failed to open vector store")?;
    let documents = eval_documents(&dataset);
    let chunk_config = ChunkConfig {
        chunk_size_tokens: config.retrieval.chunk_size_tokens,
        overlap_tokens: config.retrieval.overlap_tokens,
    };
    let collection_name = format!("eval_{}", dataset.name.to_lowercase().replace(' ', "_"));
    let stats = ingest_corpus(&documents, &embedder, &store, &collection_name, &chunk_config)
        .context("Ingestion failed")?;
    println!("  {} chunks indexed", stats.chunks);

    let collection = store
        .load(&collection_name)
        .context("Failed to load collection")?;

    let eval_config = EvaluationConfig {
        retrieval_samples: cli.retrieval_samples,
        generation_samples: cli.generation_samples,
        fetch_k: config.retrieval.top_k,
        top_k: cli.top_k,
        relevance: RelevancePolicy {
            threshold: config.retrieval.relevance_threshold,
            ..Default::default()
        },
        retrieval_only: cli.retrieval_only,
        verbose: cli.verbose,
    };

    let generator = LlmClient::new(config.llm);
    let report = run_evaluation(
        &eval_config,
        &dataset,
        &collection,
        &embedder,
        &embedder,
        &generator,
    )
    .await
    .context("Evaluation failed")?;

    report.print_summary();
    report
        .save_json(&cli.output)
        .context("Failed to save report")?;
    println!("Report saved to: {}", cli.output.display());

    Ok(())
}

/// Flatten the dataset's source documents into one ingestible document per
/// paragraph, ids following the "{item_index}_{paragraph_order}" scheme.
fn eval_documents(dataset: &EvalDataset) -> Vec<finrag::Document> {
    let mut documents = Vec::new();
    for (idx, source) in dataset.sources.iter().enumerate() {
        for (order, paragraph) in source.paragraphs.iter().enumerate() {
            documents.push(
                finrag::Document::new(format!("{}_{}", idx, order + 1), paragraph.clone())
                    .with_metadata("source_id", source.id.clone()),
            );
        }
    }
    documents
}
