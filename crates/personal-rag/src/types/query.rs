//! Chat request type shared by all query endpoints

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request body for `/chat`, `/retrieve` and `/query-without-rag`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub query: String,
    /// Retrieve context before calling the LLM
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
    /// Number of chunks to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_use_rag() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

impl ChatRequest {
    /// Create a request with default options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            use_rag: default_use_rag(),
            top_k: default_top_k(),
        }
    }

    /// Reject requests no upstream service could answer
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}
