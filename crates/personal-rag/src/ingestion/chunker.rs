//! Recursive character text chunking with overlap
//!
//! Text is split on the most meaningful separator present (paragraph, line,
//! sentence, word, character). Pieces that are still too large are split again
//! with the next separator, then small pieces are greedily merged back into
//! chunks of at most `chunk_size` characters, carrying up to `chunk_overlap`
//! characters of trailing context into the next chunk.

use sha2::{Digest, Sha256};
use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, ChunkMetadata, RawDocument};

/// Separators tried in order, most meaningful first. The empty separator splits
/// into single characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    chunk_overlap: usize,
    /// Separator priority list
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create from config
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk a batch of documents.
    ///
    /// The `chunk` index counts across the whole batch. Ids are derived from
    /// the source path and the chunk's position within its document.
    pub fn chunk_documents(&self, documents: &[RawDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            let id_prefix = source_id_prefix(&doc.metadata.source);

            for (position, text) in self.split_text(&doc.text).into_iter().enumerate() {
                let metadata = ChunkMetadata::from_document(&doc.metadata, chunks.len() as u64);
                chunks.push(Chunk {
                    id: Some(format!("{}-{}", id_prefix, position)),
                    text,
                    metadata,
                });
            }
        }

        chunks
    }

    /// Split a single text into chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // Use the first separator that occurs in the text; the rest are for
        // pieces that are still too large.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut small_pieces: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small_pieces.push(piece);
                continue;
            }

            if !small_pieces.is_empty() {
                final_chunks.extend(self.merge_pieces(&small_pieces));
                small_pieces.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece.to_string());
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small_pieces.is_empty() {
            final_chunks.extend(self.merge_pieces(&small_pieces));
        }

        final_chunks
    }

    /// Greedily merge pieces into chunks, keeping trailing pieces as overlap
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the configured {}",
                        total,
                        self.chunk_size
                    );
                }

                if !window.is_empty() {
                    if let Some(chunk) = join_trimmed(&window) {
                        chunks.push(chunk);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        let Some(first) = window.pop_front() else {
                            break;
                        };
                        total -= char_len(first);
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. Empty pieces are dropped; an empty separator yields
/// single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn join_trimmed(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn source_id_prefix(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    hex::encode(&digest[..8])
}
