//! Application state for the RAG server

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::providers::{build_embedder, LlmProvider, PerplexityClient, PineconeStore};
use crate::retrieval::Retriever;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Retriever over the configured index, built once at startup
    retriever: Arc<Retriever>,
    /// Chat completion provider
    llm: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Create state from already constructed components
    pub fn new(retriever: Arc<Retriever>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { retriever, llm }),
        }
    }

    /// Build the production components from configuration.
    ///
    /// Missing embedding or vector store credentials fail here, before the
    /// server starts listening.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let embedder = build_embedder(&config.embeddings).await?;
        let store = Arc::new(PineconeStore::new(&config.vector_db)?);
        let retriever = Arc::new(Retriever::new(
            embedder,
            store,
            config.vector_db.index_name.clone(),
        ));
        tracing::info!(
            "Retriever ready (index '{}')",
            config.vector_db.index_name
        );

        let llm = Arc::new(PerplexityClient::new(&config.llm)?);
        if config.llm.api_key.is_none() {
            tracing::warn!("PERPLEXITY_API_KEY is not set; /chat and /query-without-rag will fail");
        }
        tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());

        Ok(Self::new(retriever, llm))
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.inner.retriever
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    /// Name of the model answering requests
    pub fn model(&self) -> &str {
        self.inner.llm.model()
    }
}
