//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A vector and its metadata, as written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    /// Flat key/value metadata, including the chunk text under `text`
    pub metadata: Map<String, Value>,
}

/// One hit returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity score (cosine, higher is more similar)
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeStore`: Pinecone serverless index over REST
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Make sure `index` exists with the given dimensionality
    ///
    /// Idempotent. An existing index with a different dimensionality is an
    /// error.
    async fn ensure_index(&self, index: &str, dimension: usize) -> Result<()>;

    /// Insert or overwrite records; returns the number written
    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize>;

    /// Return up to `top_k` matches, most similar first
    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
