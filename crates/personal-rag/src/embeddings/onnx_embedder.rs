//! Local ONNX embedding provider
//!
//! Runs a sentence-transformers model exported to ONNX (all-MiniLM-L6-v2 by
//! default) with attention-masked mean pooling and L2 normalisation, the same
//! pooling the hosted sentence-transformers pipeline applies. Model and
//! tokenizer files are downloaded into the cache directory on first use.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;

/// Session and tokenizer; inference needs exclusive access
struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
    dimensions: usize,
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    model_name: String,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load the model, downloading it into the cache directory if needed
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let model_dir = config.cache_dir.join(config.model.replace('/', "--"));
        tokio::fs::create_dir_all(&model_dir)
            .await
            .map_err(|e| Error::config(format!("Failed to create cache directory: {}", e)))?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download_file(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download_file(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| Error::Embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::Embedding(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::Embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX embedder initialized successfully");

        Ok(Self {
            model: Arc::new(Mutex::new(OnnxModel {
                session,
                tokenizer,
                max_length: config.max_length,
                batch_size: config.batch_size.max(1),
                dimensions: config.dimensions,
            })),
            model_name: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model_name
    }

    /// Run inference on a blocking thread
    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.lock().embed_all(&texts))
            .await
            .map_err(|e| Error::internal(format!("Embedding task failed: {}", e)))?
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

impl OnnxModel {
    fn embed_all(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_batch(batch)?);
        }
        Ok(all_embeddings)
    }

    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(seq_len) {
                input_ids[i * seq_len + j] = ids[j] as i64;
                attention_mask[i * seq_len + j] = mask[j] as i64;
                token_type_ids[i * seq_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, seq_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::Embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| {
                    Error::Embedding(format!("Attention mask tensor creation failed: {}", e))
                })?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(|e| {
                Error::Embedding(format!("Token type tensor creation failed: {}", e))
            })?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Embedding("No output tensor".to_string()))?;

        let (tensor_shape, hidden_states) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(self.dimensions);

        Ok(mean_pool_normalized(
            hidden_states,
            &attention_mask,
            batch_size,
            seq_len,
            hidden_size,
        ))
    }
}

/// Attention-masked mean pooling over `[batch, seq, hidden]`, then L2 normalisation
fn mean_pool_normalized(
    hidden_states: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let mask_val = attention_mask[i * seq_len + j] as f32;
            if mask_val > 0.0 {
                for (k, acc) in sum.iter_mut().enumerate() {
                    let idx = i * seq_len * hidden_size + j * hidden_size + k;
                    if let Some(v) = hidden_states.get(idx) {
                        *acc += v * mask_val;
                    }
                }
                count += mask_val;
            }
        }

        if count > 0.0 {
            for val in &mut sum {
                *val /= count;
            }
        }

        let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut sum {
                *val /= norm;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}

/// Fetch one file of a model repository from the Hugging Face hub
async fn download_file(model: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!("https://huggingface.co/{}/resolve/main/{}", model, file);

    tracing::info!("Downloading {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::Embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", file, e)))?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to save {}: {}", file, e)))?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding_and_normalizes() {
        // batch 2, seq 2, hidden 2; second sequence has one padding token
        let hidden = [1.0, 0.0, 3.0, 0.0, 0.0, 2.0, 9.0, 9.0];
        let mask = [1, 1, 1, 0];
        let pooled = mean_pool_normalized(&hidden, &mask, 2, 2, 2);

        assert_eq!(pooled.len(), 2);
        assert_eq!(pooled[0], vec![1.0, 0.0]);
        assert_eq!(pooled[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_all_padding_yields_zero_vector() {
        let pooled = mean_pool_normalized(&[1.0, 1.0], &[0], 1, 1, 2);
        assert_eq!(pooled, vec![vec![0.0, 0.0]]);
    }
}
