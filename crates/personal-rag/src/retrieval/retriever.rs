//! Semantic retrieval: embed the query, search the index, map matches back
//! into chunks with provenance

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorMatch, VectorStoreProvider};
use crate::types::{ChunkMetadata, RetrievedMatch};

/// Query-time retriever over one index.
///
/// Built once at startup and shared read-only by all requests.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    index_name: String,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            index_name: index_name.into(),
        }
    }

    /// Return up to `top_k` chunks most similar to `query`, in store order
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedMatch>> {
        if top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }

        let vector = self.embedder.embed(query).await?;
        if vector.len() != self.embedder.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dimensions(),
                actual: vector.len(),
            });
        }

        let matches = self
            .store
            .query(&self.index_name, &vector, top_k, true)
            .await?;

        tracing::debug!(
            "Retrieved {} matches from '{}' for query ({} chars)",
            matches.len(),
            self.index_name,
            query.chars().count()
        );

        Ok(matches.into_iter().map(into_retrieved).collect())
    }

    /// Retrieve and render matches as a plain context block
    pub async fn retrieve_as_context(&self, query: &str, top_k: usize) -> Result<String> {
        let matches = self.retrieve(query, top_k).await?;
        Ok(format_chunks(&matches))
    }
}

/// `[Chunk i] (source: ..., similarity: ...)` blocks separated by blank lines
pub fn format_chunks(matches: &[RetrievedMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "[Chunk {}] (source: {}, similarity: {:.2})\n{}",
                i + 1,
                m.display_source(),
                m.score,
                m.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn into_retrieved(m: VectorMatch) -> RetrievedMatch {
    let mut metadata = m.metadata.unwrap_or_default();
    let text = match metadata.remove("text") {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };

    RetrievedMatch {
        id: m.id,
        score: m.score,
        text,
        metadata: parse_metadata(metadata),
    }
}

/// Records written by other tools may carry unexpected value types
fn parse_metadata(metadata: Map<String, Value>) -> ChunkMetadata {
    match serde_json::from_value(Value::Object(metadata.clone())) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Keeping raw metadata for record: {}", e);
            ChunkMetadata {
                source: string_field(&metadata, "source"),
                filename: string_field(&metadata, "filename"),
                chunk: metadata
                    .get("chunk")
                    .and_then(crate::types::document::index_from_value),
                extra: metadata
                    .into_iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "source" | "filename" | "chunk"))
                    .collect(),
            }
        }
    }
}

fn string_field(metadata: &Map<String, Value>, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
