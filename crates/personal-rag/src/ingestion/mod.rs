//! Document ingestion: loading, chunking and indexing

pub mod chunker;
pub mod loader;
mod pipeline;

pub use chunker::TextChunker;
pub use loader::{DocumentLoader, FileType};
pub use pipeline::IngestPipeline;
