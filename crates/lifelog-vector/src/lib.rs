//! Semantic retrieval for Lifelog.
//!
//! This crate indexes short text snippets from a personal data corpus and
//! retrieves the ones closest in meaning to a query. Search is exact
//! brute-force L2 over an in-memory index, persisted as three
//! position-aligned files.
//!
//! # Features
//!
//! - `fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     lifelog-vector                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider (always available)               │
//! │  └── FastEmbedProvider (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Retriever (build / load / search, writer gate + Arc swap)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Snapshot = FlatL2Index + MetadataStore + texts             │
//! │  Persistence (staged writes, blake3 companion digest)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lifelog_vector::{
//!     Document, MockEmbeddingProvider, Retriever, RetrieverConfig, SearchRequest,
//! };
//! use std::sync::Arc;
//!
//! let retriever = Retriever::new(
//!     Arc::new(MockEmbeddingProvider::new(384)),
//!     RetrieverConfig::in_dir("index"),
//! );
//! retriever
//!     .build(&[Document::new("slept 6 hours").with_collection("wearable")])
//!     .await?;
//!
//! let request = SearchRequest::new(3).with_collections("wearable");
//! for hit in retriever.search("how did I sleep?", &request).await? {
//!     println!("[{}] {}", hit.collection, hit.text);
//! }
//! ```

// Core modules (always available)
pub mod embedding;
pub mod index;
pub mod metadata;
pub mod types;

// Snapshot and service
pub mod persistence;
pub mod retriever;

// Feature-gated providers
#[cfg(feature = "fastembed")]
pub mod fastembed;

// Re-exports — core types
pub use types::{
    BuildStats, DriftPolicy, Document, EmbedderConfig, INDEX_FILE_NAME, IndexStatus,
    METADATA_FILE_NAME, RetrieverConfig, SearchHit, SearchRequest, SearchStrategy, SnapshotStats,
    TEXTS_FILE_NAME,
};

// Re-exports — embedding
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, create_embedding_provider};

// Re-exports — index and metadata
pub use index::{FlatL2Index, Neighbor, squared_l2};
pub use metadata::{CollectionFilter, MetadataEntry, MetadataStore, UNKNOWN_COLLECTION};

// Re-exports — snapshot and service
pub use persistence::{Snapshot, load_snapshot, save_snapshot, snapshot_exists};
pub use retriever::Retriever;

// Re-exports — feature-gated
#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;
