//! In-memory providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use personal_rag::error::{Error, Result};
use personal_rag::generation::Prompt;
use personal_rag::providers::{
    EmbeddingProvider, IndexRecord, LlmProvider, VectorMatch, VectorStoreProvider,
};

pub const DIMENSIONS: usize = 8;

/// Deterministic bag-of-bytes embedder that counts its calls
#[derive(Default)]
pub struct CountingEmbedder {
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; DIMENSIONS];
        for (i, byte) in text.bytes().enumerate() {
            vector[(i + byte as usize) % DIMENSIONS] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Vector store kept in memory, scored by dot product
#[derive(Default)]
pub struct MemoryStore {
    pub indexes: Mutex<HashMap<String, usize>>,
    pub records: Mutex<HashMap<String, Vec<IndexRecord>>>,
    pub queries: AtomicUsize,
    pub upsert_batches: AtomicUsize,
}

impl MemoryStore {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn records(&self, index: &str) -> Vec<IndexRecord> {
        self.records.lock().get(index).cloned().unwrap_or_default()
    }

    pub fn insert(&self, index: &str, record: IndexRecord) {
        self.indexes
            .lock()
            .entry(index.to_string())
            .or_insert(record.values.len());
        self.records
            .lock()
            .entry(index.to_string())
            .or_default()
            .push(record);
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryStore {
    async fn ensure_index(&self, index: &str, dimension: usize) -> Result<()> {
        let mut indexes = self.indexes.lock();
        match indexes.get(index).copied() {
            Some(existing) if existing != dimension => Err(Error::DimensionMismatch {
                expected: existing,
                actual: dimension,
            }),
            Some(_) => Ok(()),
            None => {
                indexes.insert(index.to_string(), dimension);
                Ok(())
            }
        }
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        self.upsert_batches.fetch_add(1, Ordering::SeqCst);
        let mut all = self.records.lock();
        let stored = all.entry(index.to_string()).or_default();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut matches: Vec<VectorMatch> = self
            .records(index)
            .into_iter()
            .map(|r| VectorMatch {
                score: r.values.iter().zip(vector).map(|(a, b)| a * b).sum(),
                id: r.id,
                metadata: include_metadata.then_some(r.metadata),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// LLM that echoes a fixed answer and remembers the prompts it saw
pub struct ScriptedLlm {
    pub answer: String,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlm {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().push(prompt.clone());
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "sonar"
    }
}

/// LLM that always fails like an upstream outage
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        Err(Error::llm("Perplexity API error (503 Service Unavailable): overloaded"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "sonar"
    }
}
