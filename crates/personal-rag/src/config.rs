//! Configuration for the RAG system
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is loaded by the binaries first).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "RAG_CONFIG";

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// LLM (chat completion) configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Which embedding implementation to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hugging Face hosted inference API
    #[default]
    Remote,
    /// Local ONNX model (requires the `local-embeddings` feature)
    Local,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "hf" | "huggingface" => Ok(Self::Remote),
            "local" | "onnx" => Ok(Self::Local),
            other => Err(Error::config(format!(
                "Unknown embedding backend '{}' (expected 'remote' or 'local')",
                other
            ))),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend selection
    pub backend: EmbeddingBackend,
    /// Model identifier (default: sentence-transformers/all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Hugging Face API token (remote backend)
    pub api_token: Option<String>,
    /// Base URL of the Hugging Face inference router
    pub api_base_url: String,
    /// Request timeout in seconds (remote backend)
    pub timeout_secs: u64,
    /// Batch size for local inference
    pub batch_size: usize,
    /// Maximum sequence length for local inference
    pub max_length: usize,
    /// Cache directory for local models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Remote,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            api_token: None,
            api_base_url: "https://router.huggingface.co/hf-inference".to_string(),
            timeout_secs: 30,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("personal-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Check that overlap is strictly smaller than the chunk size
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// LLM (Perplexity chat completions) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key; checked lazily so retrieval-only deployments can start without it
    pub api_key: Option<String>,
    /// Chat completions endpoint
    pub api_url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the answer
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "sonar".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

/// Vector database (Pinecone) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Pinecone API key
    pub api_key: Option<String>,
    /// Index name
    pub index_name: String,
    /// Serverless cloud provider used when creating an index
    pub cloud: String,
    /// Serverless region used when creating an index
    pub region: String,
    /// Control plane base URL
    pub control_plane_url: String,
    /// Value sent in the `X-Pinecone-API-Version` header
    pub api_version: String,
    /// Records per upsert request
    pub batch_size: usize,
    /// Create the index on ingestion when it does not exist
    pub create_index_if_missing: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// How long to wait for a freshly created index to become ready
    pub index_ready_timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "personal-rag".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            batch_size: 100,
            create_index_if_missing: true,
            timeout_secs: 30,
            index_ready_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the process environment.
    ///
    /// `path` takes precedence over the `RAG_CONFIG` environment variable.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_toml_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing sections and keys fall back to defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config file: {}", e)))
    }

    /// Overlay environment variables using the given lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v)?;
        }

        if let Some(v) = get("PERPLEXITY_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("PERPLEXITY_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("PERPLEXITY_API_URL") {
            self.llm.api_url = v;
        }

        if let Some(v) = get("PINECONE_API_KEY") {
            self.vector_db.api_key = Some(v);
        }
        if let Some(v) = get("PINECONE_INDEX") {
            self.vector_db.index_name = v;
        }
        if let Some(v) = get("PINECONE_ENV") {
            self.vector_db.region = v;
        }
        if let Some(v) = get("PINECONE_CLOUD") {
            self.vector_db.cloud = v;
        }

        if let Some(v) = get("HF_API_TOKEN") {
            self.embeddings.api_token = Some(v);
        }
        if let Some(v) = get("EMBEDDING_BACKEND") {
            self.embeddings.backend = v.parse()?;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embeddings.model = v;
        }
        if let Some(v) = get("EMBEDDING_DIMENSIONS") {
            self.embeddings.dimensions = parse_env("EMBEDDING_DIMENSIONS", &v)?;
        }

        if let Some(v) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }

        Ok(())
    }

    /// Reject configurations that can never work
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.vector_db.batch_size == 0 {
            return Err(Error::config("vector_db.batch_size must be greater than 0"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be greater than 0"));
        }
        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}
