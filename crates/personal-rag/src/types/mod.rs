//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, DocumentMetadata, RawDocument};
pub use query::ChatRequest;
pub use response::{ChatResponse, HealthResponse, QueryResponse, RetrieveResponse, RetrievedMatch};
