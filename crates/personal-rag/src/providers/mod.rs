//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait-based seams so the retriever, ingestion pipeline and HTTP handlers
//! never depend on a concrete service client.

pub mod embedding;
pub mod huggingface;
pub mod llm;
pub mod perplexity;
pub mod pinecone;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use huggingface::HuggingFaceEmbedder;
pub use llm::LlmProvider;
pub use perplexity::PerplexityClient;
pub use pinecone::PineconeStore;
pub use vector_store::{IndexRecord, VectorMatch, VectorStoreProvider};

/// Build the embedder selected by `config.backend`
pub async fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend {
        EmbeddingBackend::Remote => {
            tracing::info!("Using Hugging Face embeddings ({})", config.model);
            Ok(Arc::new(HuggingFaceEmbedder::new(config)?))
        }
        #[cfg(feature = "local-embeddings")]
        EmbeddingBackend::Local => {
            tracing::info!("Using local ONNX embeddings ({})", config.model);
            Ok(Arc::new(
                crate::embeddings::OnnxEmbedder::new(config).await?,
            ))
        }
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingBackend::Local => Err(crate::error::Error::config(
            "local embeddings require building with the `local-embeddings` feature",
        )),
    }
}
