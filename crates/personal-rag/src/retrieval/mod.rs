//! Query-time retrieval

pub mod retriever;

pub use retriever::{format_chunks, Retriever};
