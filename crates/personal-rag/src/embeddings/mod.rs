//! Local embedding models

#[cfg(feature = "local-embeddings")]
pub mod onnx_embedder;

#[cfg(feature = "local-embeddings")]
pub use onnx_embedder::OnnxEmbedder;
