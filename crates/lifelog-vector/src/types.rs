//! Common types for the retrieval index.
//!
//! These types are shared by the index, the retrieval service, and the
//! ingestion crate, and are always available regardless of feature flags.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::{CollectionFilter, MetadataEntry, normalize_collection};

// ============================================================================
// Configuration
// ============================================================================

/// Retrieval service configuration.
///
/// Controls where the three snapshot files live and how searches behave
/// when the caller does not say otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Path to the binary vector index file.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Path to the metadata array (JSON).
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Path to the raw text array (JSON).
    #[serde(default = "default_texts_path")]
    pub texts_path: PathBuf,

    /// Number of candidates requested when a search does not specify one.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Default filter/rank interaction.
    #[serde(default)]
    pub strategy: SearchStrategy,

    /// How to react when vectors, metadata, and texts disagree in length.
    #[serde(default)]
    pub drift_policy: DriftPolicy,
}

/// Default file name of the vector index.
pub const INDEX_FILE_NAME: &str = "semantic_index.bin";

/// Default file name of the metadata array.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Default file name of the text array.
pub const TEXTS_FILE_NAME: &str = "texts.json";

fn default_index_path() -> PathBuf {
    PathBuf::from(INDEX_FILE_NAME)
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from(METADATA_FILE_NAME)
}

fn default_texts_path() -> PathBuf {
    PathBuf::from(TEXTS_FILE_NAME)
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            metadata_path: default_metadata_path(),
            texts_path: default_texts_path(),
            default_top_k: default_top_k(),
            strategy: SearchStrategy::default(),
            drift_policy: DriftPolicy::default(),
        }
    }
}

impl RetrieverConfig {
    /// Configuration with all three snapshot files inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            index_path: dir.join(INDEX_FILE_NAME),
            metadata_path: dir.join(METADATA_FILE_NAME),
            texts_path: dir.join(TEXTS_FILE_NAME),
            ..Default::default()
        }
    }

    /// Set the drift policy.
    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }

    /// Set the default search strategy.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The snapshot file paths, index first.
    pub fn snapshot_paths(&self) -> [&Path; 3] {
        [
            self.index_path.as_path(),
            self.metadata_path.as_path(),
            self.texts_path.as_path(),
        ]
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Embedding provider: "fastembed" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model name (e.g., "all-minilm-l6-v2").
    #[serde(default = "default_model")]
    pub model: String,

    /// Vector dimension for the mock provider. Real models report their own.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Directory for cached model files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
}

fn default_provider() -> String {
    "fastembed".to_string()
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            cache_path: None,
        }
    }
}

impl EmbedderConfig {
    /// Configuration for the deterministic mock provider.
    pub fn mock(dimension: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            dimension,
            ..Default::default()
        }
    }
}

// ============================================================================
// Policies
// ============================================================================

/// How collection filtering interacts with nearest-neighbor ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Rank `top_k` candidates, then drop those outside the filter.
    ///
    /// May return fewer than `top_k` hits even when more matching
    /// documents exist further down the ranking.
    #[default]
    RankThenFilter,

    /// Widen the candidate window until `top_k` filtered hits are found
    /// or the corpus is exhausted.
    ExpandUntilFilled,
}

/// Reaction to length drift between vectors, metadata, and texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftPolicy {
    /// Reject drifted snapshots at build/load and fail out-of-range lookups.
    #[default]
    Strict,

    /// Accept drifted snapshots with a warning; skip out-of-range candidates.
    Lenient,
}

// ============================================================================
// Documents
// ============================================================================

/// A unit of text to index, tagged with the collection it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text to be embedded.
    pub text: String,

    /// Source collection tag (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Document {
    /// Create an untagged document.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            collection: None,
        }
    }

    /// Set the collection tag.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// True when the text has content after trimming.
    pub fn is_indexable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// The metadata entry this document is stored with.
    pub fn metadata(&self) -> MetadataEntry {
        MetadataEntry::new(normalize_collection(self.collection.as_deref()))
    }
}

// ============================================================================
// Search types
// ============================================================================

/// Parameters for a retrieval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Candidates requested from the index before filtering.
    pub top_k: usize,

    /// Collections to keep. Empty keeps everything.
    #[serde(default)]
    pub collection_filter: CollectionFilter,

    /// Attach the raw L2 distance to each hit.
    #[serde(default)]
    pub include_scores: bool,

    /// Filter/rank interaction.
    #[serde(default)]
    pub strategy: SearchStrategy,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            collection_filter: CollectionFilter::default(),
            include_scores: false,
            strategy: SearchStrategy::default(),
        }
    }
}

impl SearchRequest {
    /// Create a request for `top_k` candidates.
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    /// Restrict results to one or more collections.
    pub fn with_collections(mut self, filter: impl Into<CollectionFilter>) -> Self {
        self.collection_filter = filter.into();
        self
    }

    /// Attach distances to the hits.
    pub fn with_scores(mut self) -> Self {
        self.include_scores = true;
        self
    }

    /// Set the filter/rank strategy.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// A single retrieved snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The stored text.
    pub text: String,

    /// Lowercase collection name.
    pub collection: String,

    /// The full metadata entry.
    pub metadata: MetadataEntry,

    /// Squared L2 distance to the query (lower is closer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

// ============================================================================
// Index state and statistics
// ============================================================================

/// Lifecycle state of a retriever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    /// Nothing loaded yet.
    Empty,
    /// A build is in progress.
    Building,
    /// A snapshot is loaded and searchable.
    Ready,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "empty",
            Self::Building => "building",
            Self::Ready => "ready",
        };
        f.write_str(label)
    }
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Number of documents indexed.
    pub documents_indexed: usize,

    /// Documents dropped because their text was blank.
    pub documents_skipped: usize,

    /// Embedding dimension (0 for an empty corpus).
    pub embedding_dimension: usize,

    /// Documents per collection.
    pub collections: BTreeMap<String, usize>,

    /// Build duration in milliseconds.
    pub build_duration_ms: u64,

    /// When the build finished.
    pub built_at: DateTime<Utc>,
}

/// Shape of the currently loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// Number of indexed vectors.
    pub document_count: usize,

    /// Vector dimension (0 when empty).
    pub dimension: usize,

    /// Documents per collection.
    pub collections: BTreeMap<String, usize>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // RetrieverConfig tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_retriever_config_default() {
        let config = RetrieverConfig::default();
        assert_eq!(config.index_path, PathBuf::from("semantic_index.bin"));
        assert_eq!(config.metadata_path, PathBuf::from("metadata.json"));
        assert_eq!(config.texts_path, PathBuf::from("texts.json"));
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.strategy, SearchStrategy::RankThenFilter);
        assert_eq!(config.drift_policy, DriftPolicy::Strict);
    }

    #[test]
    fn test_retriever_config_in_dir() {
        let config = RetrieverConfig::in_dir("/var/lifelog");
        let paths = config.snapshot_paths();
        assert_eq!(paths[0], Path::new("/var/lifelog/semantic_index.bin"));
        assert_eq!(paths[1], Path::new("/var/lifelog/metadata.json"));
        assert_eq!(paths[2], Path::new("/var/lifelog/texts.json"));
    }

    #[test]
    fn test_retriever_config_deserialization_with_defaults() {
        let json = r#"{"drift_policy": "lenient", "strategy": "expand_until_filled"}"#;
        let config: RetrieverConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.drift_policy, DriftPolicy::Lenient);
        assert_eq!(config.strategy, SearchStrategy::ExpandUntilFilled);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.index_path, PathBuf::from("semantic_index.bin"));
    }

    #[test]
    fn test_embedder_config_default() {
        let config = EmbedderConfig::default();
        assert_eq!(config.provider, "fastembed");
        assert_eq!(config.model, "all-minilm-l6-v2");
        assert_eq!(config.dimension, 384);
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn test_embedder_config_mock() {
        let config = EmbedderConfig::mock(16);
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimension, 16);
    }

    // ------------------------------------------------------------------------
    // Document tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_document_metadata_defaults_to_unknown() {
        let doc = Document::new("slept 7 hours");
        assert_eq!(doc.metadata().collection_name, "unknown");
    }

    #[test]
    fn test_document_metadata_lowercases() {
        let doc = Document::new("slept 7 hours").with_collection("Wearable");
        assert_eq!(doc.metadata().collection_name, "wearable");
    }

    #[test]
    fn test_document_is_indexable() {
        assert!(Document::new("valid text").is_indexable());
        assert!(!Document::new("").is_indexable());
        assert!(!Document::new("  \n\t").is_indexable());
    }

    #[test]
    fn test_document_serialization_skips_missing_collection() {
        let json = serde_json::to_string(&Document::new("text")).unwrap();
        assert!(!json.contains("collection"));
    }

    // ------------------------------------------------------------------------
    // SearchRequest tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_search_request_default() {
        let request = SearchRequest::default();
        assert_eq!(request.top_k, 5);
        assert!(request.collection_filter.is_empty());
        assert!(!request.include_scores);
        assert_eq!(request.strategy, SearchStrategy::RankThenFilter);
    }

    #[test]
    fn test_search_request_builder() {
        let request = SearchRequest::new(3)
            .with_collections("Wearable")
            .with_scores()
            .with_strategy(SearchStrategy::ExpandUntilFilled);

        assert_eq!(request.top_k, 3);
        assert!(request.collection_filter.matches("wearable"));
        assert!(!request.collection_filter.matches("chat_history"));
        assert!(request.include_scores);
        assert_eq!(request.strategy, SearchStrategy::ExpandUntilFilled);
    }

    // ------------------------------------------------------------------------
    // SearchHit tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_search_hit_without_score_omits_field() {
        let hit = SearchHit {
            text: "slept 8 hours".to_string(),
            collection: "wearable".to_string(),
            metadata: MetadataEntry::new("wearable"),
            score: None,
        };
        let json = serde_json::to_string(&hit).unwrap();
        assert!(!json.contains("score"));
        assert!(json.contains("\"collection_name\":\"wearable\""));
    }

    #[test]
    fn test_search_hit_with_score() {
        let hit = SearchHit {
            text: "slept 8 hours".to_string(),
            collection: "wearable".to_string(),
            metadata: MetadataEntry::new("wearable"),
            score: Some(0.25),
        };
        let json = serde_json::to_string(&hit).unwrap();
        assert!(json.contains("\"score\":0.25"));
    }

    #[test]
    fn test_index_status_display() {
        assert_eq!(IndexStatus::Empty.to_string(), "empty");
        assert_eq!(IndexStatus::Building.to_string(), "building");
        assert_eq!(IndexStatus::Ready.to_string(), "ready");
    }
}
