//! Hugging Face Inference API embedding provider
//!
//! Calls the hosted feature-extraction pipeline once per text. The endpoint
//! returns a sentence vector for sentence-transformers models, but some
//! models answer with per-token vectors instead; those are mean-pooled.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;

/// Hugging Face hosted embedding provider
#[derive(Debug)]
pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    api_token: String,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl HuggingFaceEmbedder {
    /// Create a new embedder; fails without an API token
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_token = config
            .api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::config("HF_API_TOKEN is not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_token,
            endpoint: format!(
                "{}/models/{}/pipeline/feature-extraction",
                config.api_base_url.trim_end_matches('/'),
                config.model
            ),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[derive(serde::Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&FeatureExtractionRequest { inputs: text })
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Hugging Face request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Hugging Face embedding with {} failed ({}): {}",
                self.model, status, body
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Hugging Face response: {}", e)))?;

        flatten_embedding(&value)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

/// Turn an array-shaped JSON response into one vector.
///
/// A flat array is used as-is, a single nested row is unwrapped, and several
/// rows (token vectors) are averaged.
pub fn flatten_embedding(value: &Value) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::embedding(format!("Expected a JSON array, got: {}", value)))?;

    if items.is_empty() {
        return Err(Error::embedding("Empty embedding in response"));
    }

    if items.iter().all(Value::is_number) {
        return Ok(items
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect());
    }

    if !items.iter().all(Value::is_array) {
        return Err(Error::embedding("Embedding response mixes numbers and arrays"));
    }

    let mut rows = items
        .iter()
        .map(flatten_embedding)
        .collect::<Result<Vec<_>>>()?;

    if rows.len() == 1 {
        return Ok(rows.swap_remove(0));
    }

    mean_pool(&rows)
}

fn mean_pool(rows: &[Vec<f32>]) -> Result<Vec<f32>> {
    let width = rows[0].len();
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::embedding("Token vectors have inconsistent lengths"));
    }

    let mut pooled = vec![0.0f32; width];
    for row in rows {
        for (acc, v) in pooled.iter_mut().zip(row) {
            *acc += v;
        }
    }
    let count = rows.len() as f32;
    for v in &mut pooled {
        *v /= count;
    }

    Ok(pooled)
}
