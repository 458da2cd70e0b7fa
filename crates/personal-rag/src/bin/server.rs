//! RAG Server binary
//!
//! Run with: cargo run -p personal-rag --bin personal-rag-server

use personal_rag::{config::AppConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "personal_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load(None)?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding backend: {:?}", config.embeddings.backend);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Pinecone index: {}", config.vector_db.index_name);
    tracing::info!("  - LLM model: {}", config.llm.model);

    let server = RagServer::from_config(&config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("\nEndpoints:");
    println!("  GET  /health            - Service status");
    println!("  POST /chat              - Ask with retrieved context");
    println!("  POST /retrieve          - Retrieve matching chunks");
    println!("  POST /query-without-rag - Ask the model directly");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
