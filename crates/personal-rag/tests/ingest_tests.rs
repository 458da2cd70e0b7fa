mod common;

use async_trait::async_trait;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{CountingEmbedder, MemoryStore, DIMENSIONS};
use personal_rag::ingestion::{IngestPipeline, TextChunker};
use personal_rag::providers::{EmbeddingProvider, IndexRecord};
use personal_rag::{Error, RawDocument};

const INDEX: &str = "notes";

fn pipeline(embedder: &Arc<CountingEmbedder>, store: &Arc<MemoryStore>) -> IngestPipeline {
    IngestPipeline::new(
        TextChunker::new(1000, 200).unwrap(),
        embedder.clone(),
        store.clone(),
    )
}

fn sorted_by_chunk(mut records: Vec<IndexRecord>) -> Vec<IndexRecord> {
    records.sort_by_key(|r| r.metadata.get("chunk").and_then(|c| c.as_u64()));
    records
}

#[tokio::test]
async fn three_thousand_char_document_yields_four_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.txt");
    fs::write(&path, "abcdefghi ".repeat(300)).unwrap();

    let embedder = Arc::new(CountingEmbedder::default());
    let store = Arc::new(MemoryStore::default());

    let count = pipeline(&embedder, &store)
        .ingest(dir.path(), INDEX)
        .await
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(embedder.calls(), 4);
    assert_eq!(store.indexes.lock().get(INDEX), Some(&DIMENSIONS));

    let expected_source = path.to_string_lossy().to_string();
    let records = sorted_by_chunk(store.records(INDEX));
    assert_eq!(records.len(), 4);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.metadata.get("chunk"), Some(&json!(i)));
        assert_eq!(
            record.metadata.get("source").and_then(|s| s.as_str()),
            Some(expected_source.as_str())
        );
        assert_eq!(record.metadata.get("filename"), Some(&json!("long.txt")));
        let text = record.metadata.get("text").and_then(|t| t.as_str()).unwrap();
        assert!(!text.is_empty());
        assert!(text.chars().count() <= 1000);
        assert_eq!(record.values.len(), DIMENSIONS);
    }
}

#[tokio::test]
async fn empty_source_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blank.md"), "   \n\n").unwrap();
    fs::write(dir.path().join("image.png"), [0u8, 1, 2, 3]).unwrap();

    let embedder = Arc::new(CountingEmbedder::default());
    let store = Arc::new(MemoryStore::default());

    let count = pipeline(&embedder, &store)
        .ingest(dir.path(), INDEX)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(embedder.calls(), 0);
    assert!(store.indexes.lock().is_empty());
    assert_eq!(store.upsert_batches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reingesting_overwrites_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "# Notes\n\nShort note about Rust.").unwrap();
    fs::write(dir.path().join("b.txt"), "Another short note.").unwrap();

    let embedder = Arc::new(CountingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(&embedder, &store);

    assert_eq!(pipeline.ingest(dir.path(), INDEX).await.unwrap(), 2);
    assert_eq!(pipeline.ingest(dir.path(), INDEX).await.unwrap(), 2);

    let records = store.records(INDEX);
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].id, records[1].id);
}

#[tokio::test]
async fn missing_source_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::default());
    let store = Arc::new(MemoryStore::default());

    let result = pipeline(&embedder, &store)
        .ingest(&dir.path().join("does-not-exist"), INDEX)
        .await;
    assert!(matches!(result, Err(personal_rag::Error::Config(_))));
}

/// Configured for a 384-dimension model but actually serving a 768-dimension one
struct SwappedModelEmbedder;

#[async_trait]
impl EmbeddingProvider for SwappedModelEmbedder {
    async fn embed(&self, _text: &str) -> personal_rag::Result<Vec<f32>> {
        Ok(vec![0.1; 768])
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn name(&self) -> &str {
        "swapped"
    }
}

#[tokio::test]
async fn model_dimension_mismatch_fails_before_index_is_touched() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = IngestPipeline::new(
        TextChunker::new(1000, 200).unwrap(),
        Arc::new(SwappedModelEmbedder),
        store.clone(),
    );
    let documents = vec![RawDocument::new(
        "A short note embedded by the wrong model.",
        Path::new("/notes/wrong.txt"),
    )];

    let result = pipeline.ingest_documents(&documents, INDEX).await;

    assert!(matches!(
        result,
        Err(Error::DimensionMismatch {
            expected: 384,
            actual: 768
        })
    ));
    assert!(store.indexes.lock().is_empty());
    assert_eq!(store.upsert_batches.load(Ordering::SeqCst), 0);
}
