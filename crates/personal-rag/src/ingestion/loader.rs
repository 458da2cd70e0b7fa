//! Document loading for plain text, Markdown and PDF files

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::RawDocument;

/// File types the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// PDF document
    Pdf,
    /// Anything else
    Unsupported,
}

impl FileType {
    /// Detect file type from extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" => Self::Txt,
            "md" => Self::Markdown,
            "pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }

    /// Detect file type from a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::from_extension(&ext.to_string_lossy()))
            .unwrap_or(Self::Unsupported)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Loads documents from a file or a directory tree
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load every supported document under `source`.
    ///
    /// Files that cannot be read or parsed are logged and skipped. A `source`
    /// that is neither a file nor a directory is a configuration error.
    pub fn load(source: &Path) -> Result<Vec<RawDocument>> {
        let files = Self::collect_files(source)?;
        let mut documents = Vec::with_capacity(files.len());

        for path in files {
            let file_type = FileType::from_path(&path);
            if !file_type.is_supported() {
                tracing::debug!("Skipping unsupported file type: {}", path.display());
                continue;
            }

            match Self::load_file(&path, file_type) {
                Ok(text) if text.trim().is_empty() => {
                    tracing::debug!("No text extracted from {}; skipping", path.display());
                }
                Ok(text) => documents.push(RawDocument::new(text, &path)),
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                }
            }
        }

        Ok(documents)
    }

    /// List candidate files in sorted path order
    fn collect_files(source: &Path) -> Result<Vec<PathBuf>> {
        if source.is_file() {
            return Ok(vec![source.to_path_buf()]);
        }

        if !source.is_dir() {
            return Err(Error::config(format!(
                "source path not found: {}",
                source.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(source)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        Ok(files)
    }

    /// Read and extract the text of a single file
    pub fn load_file(path: &Path, file_type: FileType) -> Result<String> {
        let data = std::fs::read(path)?;

        match file_type {
            FileType::Txt | FileType::Markdown => Ok(decode_utf8_ignoring_invalid(&data)),
            FileType::Pdf => extract_pdf_text(&data, &display_name(path)),
            FileType::Unsupported => Err(Error::UnsupportedFileType(display_name(path))),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them
pub fn decode_utf8_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());

    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // Truncated sequence at the end of input
                    None => break,
                }
            }
        }
    }

    text
}

/// Extract PDF text page by page, joined with newlines.
///
/// A page whose text cannot be extracted contributes an empty string.
fn extract_pdf_text(data: &[u8], filename: &str) -> Result<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|&page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(
                    "Could not extract text from {} page {}: {}",
                    filename,
                    page_number,
                    e
                );
                String::new()
            }
        })
        .collect();

    Ok(pages.join("\n"))
}
