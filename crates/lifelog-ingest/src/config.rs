//! Ingestion settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the raw records live and how they are chunked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the five source JSON files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_chunk_size() -> usize {
    200
}

fn default_chunk_overlap() -> usize {
    30
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}
