//! Document and chunk types with provenance metadata

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Metadata attached to a loaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Full path the document was read from
    pub source: String,
    /// File name component of `source`
    pub filename: String,
    /// Provider-specific extra keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentMetadata {
    /// Build metadata for a file on disk
    pub fn for_path(path: &Path) -> Self {
        Self {
            source: path.to_string_lossy().to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            extra: Map::new(),
        }
    }
}

/// Text of one loaded file, before chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Extracted text
    pub text: String,
    /// Source information
    pub metadata: DocumentMetadata,
}

impl RawDocument {
    /// Create a document from text and a source path
    pub fn new(text: impl Into<String>, path: &Path) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata::for_path(path),
        }
    }
}

/// Metadata carried by a chunk and stored alongside its vector.
///
/// Records written by other tools may lack any of the fixed fields, so every
/// field is optional on the way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Full path of the originating document
    #[serde(default)]
    pub source: String,
    /// File name of the originating document
    #[serde(default)]
    pub filename: String,
    /// Zero-based chunk sequence number
    #[serde(
        default,
        deserialize_with = "deserialize_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub chunk: Option<u64>,
    /// Provider-specific extra keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    /// Derive chunk metadata from the document it was cut from.
    ///
    /// A `chunk` value already present in the document metadata wins over
    /// `index`.
    pub fn from_document(metadata: &DocumentMetadata, index: u64) -> Self {
        let mut extra = metadata.extra.clone();
        let chunk = extra
            .remove("chunk")
            .as_ref()
            .and_then(index_from_value)
            .unwrap_or(index);

        Self {
            source: metadata.source.clone(),
            filename: metadata.filename.clone(),
            chunk: Some(chunk),
            extra,
        }
    }

    /// Flatten into the key/value map stored in the vector index, including the chunk text.
    ///
    /// Null values are dropped since the index only accepts scalars and string lists.
    pub fn to_record_metadata(&self, text: &str) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in &self.extra {
            if !value.is_null() {
                map.insert(key.clone(), value.clone());
            }
        }
        map.insert("source".to_string(), Value::String(self.source.clone()));
        map.insert("filename".to_string(), Value::String(self.filename.clone()));
        if let Some(chunk) = self.chunk {
            map.insert("chunk".to_string(), Value::from(chunk));
        }
        map.insert("text".to_string(), Value::String(text.to_string()));
        map
    }
}

/// A piece of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Record id; a random one is generated at upsert time when absent
    pub id: Option<String>,
    /// Chunk text
    pub text: String,
    /// Provenance
    pub metadata: ChunkMetadata,
}

/// Read an index that may have been stored as an integer or an integral float
pub(crate) fn index_from_value(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

fn deserialize_index<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(index_from_value))
}
