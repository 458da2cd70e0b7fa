//! Response types for retrieval and chat endpoints

use serde::{Deserialize, Serialize};

use super::document::ChunkMetadata;

/// One chunk returned by the retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    /// Record id in the vector index
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    /// Chunk text
    pub text: String,
    /// Provenance
    pub metadata: ChunkMetadata,
}

impl RetrievedMatch {
    /// File name for display, `unknown` when the record carries none
    pub fn display_filename(&self) -> &str {
        non_empty_or_unknown(&self.metadata.filename)
    }

    /// Source path for display, `unknown` when the record carries none
    pub fn display_source(&self) -> &str {
        non_empty_or_unknown(&self.metadata.source)
    }
}

fn non_empty_or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

/// Response body for `/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub query: String,
    pub response: String,
    /// Chunks passed to the LLM; `null` when retrieval was skipped
    pub context_used: Option<Vec<RetrievedMatch>>,
    pub model: String,
}

/// Response body for `/query-without-rag`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
    pub model: String,
}

/// Response body for `/retrieve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub documents: Vec<RetrievedMatch>,
    pub count: usize,
}

impl RetrieveResponse {
    pub fn new(query: String, documents: Vec<RetrievedMatch>) -> Self {
        Self {
            query,
            count: documents.len(),
            documents,
        }
    }
}

/// Response body for `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_serializes_null_context() {
        let response = ChatResponse {
            query: "q".to_string(),
            response: "a".to_string(),
            context_used: None,
            model: "sonar".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["context_used"].is_null());
    }

    #[test]
    fn test_display_fallbacks() {
        let m = RetrievedMatch {
            id: "x".to_string(),
            score: 0.5,
            text: String::new(),
            metadata: ChunkMetadata::default(),
        };
        assert_eq!(m.display_filename(), "unknown");
        assert_eq!(m.display_source(), "unknown");
    }
}
