//! Command-line entry points for loading, chunking and ingesting documents
//!
//! Run with: cargo run -p personal-rag --bin personal-rag -- ingest ./docs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use personal_rag::config::AppConfig;
use personal_rag::ingestion::{DocumentLoader, IngestPipeline, TextChunker};
use personal_rag::providers::{build_embedder, PineconeStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Personal RAG - index local documents into Pinecone
#[derive(Parser)]
#[command(name = "personal-rag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents and report how many were read
    Load {
        /// File or directory to load
        source: PathBuf,
    },

    /// Load and chunk documents and report the chunk count
    Chunk {
        /// File or directory to load
        source: PathBuf,

        /// Maximum chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Load, chunk, embed and upsert documents into a Pinecone index
    Ingest {
        /// File or directory to ingest
        source: PathBuf,

        /// Pinecone index name
        #[arg(long)]
        index: Option<String>,

        /// Hugging Face API token
        #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
        hf_token: Option<String>,

        /// Pinecone API key
        #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
        pinecone_key: Option<String>,

        /// Pinecone serverless region
        #[arg(long, env = "PINECONE_ENV")]
        pinecone_env: Option<String>,

        /// Maximum chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "personal_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Load { source } => {
            let documents = DocumentLoader::load(&source)?;
            println!("Loaded {} documents", documents.len());
        }

        Commands::Chunk {
            source,
            chunk_size,
            chunk_overlap,
        } => {
            apply_chunking(&mut config, chunk_size, chunk_overlap);
            let chunker = TextChunker::from_config(&config.chunking)?;
            let documents = DocumentLoader::load(&source)?;
            let chunks = chunker.chunk_documents(&documents);
            println!("Produced {} chunks", chunks.len());
        }

        Commands::Ingest {
            source,
            index,
            hf_token,
            pinecone_key,
            pinecone_env,
            chunk_size,
            chunk_overlap,
        } => {
            apply_chunking(&mut config, chunk_size, chunk_overlap);
            if let Some(index) = index {
                config.vector_db.index_name = index;
            }
            if hf_token.is_some() {
                config.embeddings.api_token = hf_token;
            }
            if pinecone_key.is_some() {
                config.vector_db.api_key = pinecone_key;
            }
            if let Some(region) = pinecone_env {
                config.vector_db.region = region;
            }

            let chunker = TextChunker::from_config(&config.chunking)?;
            let embedder = build_embedder(&config.embeddings).await?;
            let store = Arc::new(PineconeStore::new(&config.vector_db)?);
            let pipeline = IngestPipeline::new(chunker, embedder, store);

            let index = config.vector_db.index_name.clone();
            let count = pipeline.ingest(&source, &index).await?;
            println!("Upserted {} vectors into Pinecone index '{}'", count, index);
        }
    }

    Ok(())
}

fn apply_chunking(config: &mut AppConfig, chunk_size: Option<usize>, chunk_overlap: Option<usize>) {
    if let Some(size) = chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = chunk_overlap {
        config.chunking.chunk_overlap = overlap;
    }
}
