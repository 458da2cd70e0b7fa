//! personal-rag: retrieval-augmented question answering over a personal document folder
//!
//! Text, Markdown and PDF files are chunked, embedded (Hugging Face inference
//! API or a local ONNX model) and stored in a Pinecone index. An axum service
//! answers questions with a Perplexity chat model, optionally grounded in the
//! most similar chunks.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{Chunk, ChunkMetadata, RawDocument, RetrievedMatch};
