//! Corpus loading: data directory → tagged, chunked documents.

use std::path::Path;

use lifelog_core::{Error, Result};
use lifelog_vector::Document;

use crate::config::IngestConfig;
use crate::formatter::{RecordFormatter, default_formatters};
use crate::splitter::TextSplitter;

/// Reads every source file, formats its records, and chunks the sentences.
pub struct CorpusLoader {
    formatters: Vec<Box<dyn RecordFormatter>>,
    splitter: TextSplitter,
}

impl CorpusLoader {
    /// A loader with the five standard formatters.
    pub fn new(splitter: TextSplitter) -> Self {
        Self {
            formatters: default_formatters(),
            splitter,
        }
    }

    /// A loader using the chunking settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid chunk settings.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Ok(Self::new(TextSplitter::new(
            config.chunk_size,
            config.chunk_overlap,
        )?))
    }

    /// Replace the formatter set.
    pub fn with_formatters(mut self, formatters: Vec<Box<dyn RecordFormatter>>) -> Self {
        self.formatters = formatters;
        self
    }

    /// Load all documents under `data_dir`, in formatter order.
    ///
    /// A missing source file is skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if `data_dir` does not exist
    /// - [`Error::Parse`] if a file is not valid JSON or has the wrong shape
    /// - [`Error::IoWithPath`] for other read failures
    pub async fn load(&self, data_dir: impl AsRef<Path>) -> Result<Vec<Document>> {
        let data_dir = data_dir.as_ref();
        if !tokio::fs::try_exists(data_dir).await.unwrap_or(false) {
            return Err(Error::not_found(
                "Data directory",
                data_dir.display().to_string(),
            ));
        }

        let mut documents = Vec::new();
        for formatter in &self.formatters {
            let path = data_dir.join(formatter.file_name());
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("Skipping {}: file not found", path.display());
                    continue;
                }
                Err(e) => return Err(Error::io_with_path(e, &path)),
            };

            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;

            let before = documents.len();
            for sentence in formatter.format(&value)? {
                documents.extend(
                    self.splitter
                        .split_text(&sentence)
                        .into_iter()
                        .map(|chunk| Document::new(chunk).with_collection(formatter.collection())),
                );
            }
            log::debug!(
                "Loaded {} chunk(s) from {}",
                documents.len() - before,
                path.display()
            );
        }

        log::info!(
            "Loaded {} document(s) from {}",
            documents.len(),
            data_dir.display()
        );
        Ok(documents)
    }
}

impl std::fmt::Debug for CorpusLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let files: Vec<&str> = self.formatters.iter().map(|f| f.file_name()).collect();
        f.debug_struct("CorpusLoader")
            .field("files", &files)
            .field("splitter", &self.splitter)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
