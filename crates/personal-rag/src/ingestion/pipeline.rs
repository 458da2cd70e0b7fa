//! Ingestion pipeline orchestration: load, chunk, embed, upsert

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexRecord, VectorStoreProvider};
use crate::types::{Chunk, RawDocument};

use super::chunker::TextChunker;
use super::loader::DocumentLoader;

/// Main ingestion pipeline
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Ingest every supported file under `source` into `index`.
    ///
    /// Returns the number of vectors written.
    pub async fn ingest(&self, source: &Path, index: &str) -> Result<usize> {
        let source: PathBuf = source.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || DocumentLoader::load(&source))
            .await
            .map_err(|e| Error::internal(format!("Loader task failed: {}", e)))??;

        tracing::info!("Loaded {} documents", documents.len());

        self.ingest_documents(&documents, index).await
    }

    /// Chunk, embed and upsert already loaded documents
    pub async fn ingest_documents(&self, documents: &[RawDocument], index: &str) -> Result<usize> {
        let chunks = self.chunker.chunk_documents(documents);
        if chunks.is_empty() {
            tracing::info!("No chunks produced; nothing to upsert");
            return Ok(0);
        }

        tracing::info!("Produced {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension != self.embedder.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dimensions(),
                actual: dimension,
            });
        }
        self.store.ensure_index(index, dimension).await?;

        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, values)| into_record(chunk, values))
            .collect();

        let written = self.store.upsert(index, &records).await?;
        tracing::info!(
            "Upserted {} vectors into {} index '{}'",
            written,
            self.store.name(),
            index
        );

        Ok(written)
    }
}

fn into_record(chunk: Chunk, values: Vec<f32>) -> IndexRecord {
    let metadata = chunk.metadata.to_record_metadata(&chunk.text);
    IndexRecord {
        id: chunk
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        values,
        metadata,
    }
}
