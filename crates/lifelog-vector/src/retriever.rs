//! The retrieval service.
//!
//! [`Retriever`] owns one embedding provider and at most one loaded
//! [`Snapshot`]. Searches clone the snapshot's `Arc` under a short read
//! lock and then work on an immutable triple; `build` and `load` are
//! serialized by a writer gate and publish a new snapshot with a single
//! pointer swap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use lifelog_core::{Error, Result};
use tokio::sync::{Mutex, RwLock};

use crate::embedding::EmbeddingProvider;
use crate::index::{FlatL2Index, Neighbor};
use crate::metadata::{MetadataEntry, MetadataStore};
use crate::persistence::{Snapshot, load_snapshot, save_snapshot};
use crate::types::{
    BuildStats, Document, DriftPolicy, IndexStatus, RetrieverConfig, SearchHit, SearchRequest,
    SearchStrategy, SnapshotStats,
};

/// Builds, persists, loads, and searches the semantic index.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrieverConfig,
    state: RwLock<Option<Arc<Snapshot>>>,
    writer: Mutex<()>,
    building: AtomicBool,
}

/// Clears the building flag when a build returns, on success or error.
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Retriever {
    /// Create a retriever with nothing loaded.
    ///
    /// No files are touched until the first `build`, `load`, or `search`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrieverConfig) -> Self {
        Self {
            provider,
            config,
            state: RwLock::new(None),
            writer: Mutex::new(()),
            building: AtomicBool::new(false),
        }
    }

    /// The retriever's configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// The embedding provider in use.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// A request using the configured `default_top_k` and strategy.
    pub fn default_request(&self) -> SearchRequest {
        SearchRequest::new(self.config.default_top_k).with_strategy(self.config.strategy)
    }

    /// Current lifecycle state.
    ///
    /// `Building` is reported only while [`Retriever::build`] runs. A load
    /// in progress reports the state it started from.
    pub async fn status(&self) -> IndexStatus {
        if self.building.load(Ordering::Acquire) {
            return IndexStatus::Building;
        }
        match self.state.read().await.as_ref() {
            Some(_) => IndexStatus::Ready,
            None => IndexStatus::Empty,
        }
    }

    /// Shape of the loaded snapshot, if any.
    pub async fn stats(&self) -> Option<SnapshotStats> {
        self.current().await.map(|s| s.stats())
    }

    // ------------------------------------------------------------------------
    // Build / load
    // ------------------------------------------------------------------------

    /// Index `documents`, replacing whatever was indexed before.
    ///
    /// Documents whose text is blank after trimming are skipped. The new
    /// snapshot is written to disk before it becomes visible to searches;
    /// on any failure the previous snapshot stays in place, in memory and
    /// on disk.
    pub async fn build(&self, documents: &[Document]) -> Result<BuildStats> {
        let _gate = self.writer.lock().await;
        let _building = BuildingFlag::raise(&self.building);
        let started = Instant::now();

        let kept: Vec<&Document> = documents.iter().filter(|d| d.is_indexable()).collect();
        let skipped = documents.len() - kept.len();
        if skipped > 0 {
            log::debug!("Skipping {skipped} blank document(s)");
        }

        let texts: Vec<&str> = kept.iter().map(|d| d.text.as_str()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.provider.embed_batch(&texts).await?
        };
        if vectors.len() != texts.len() {
            return Err(Error::embedding(
                self.provider.name(),
                format!(
                    "returned {} embeddings for {} texts",
                    vectors.len(),
                    texts.len()
                ),
            ));
        }

        let mut index = FlatL2Index::new();
        index.add(&vectors)?;
        let metadata: MetadataStore = kept.iter().map(|d| d.metadata()).collect();
        let texts: Vec<String> = texts.into_iter().map(str::to_string).collect();

        let snapshot = Snapshot::new(index, metadata, texts);
        snapshot.check_alignment(DriftPolicy::Strict)?;

        let snapshot = Arc::new(snapshot);
        self.persist(Arc::clone(&snapshot)).await?;

        let stats = snapshot.stats();
        *self.state.write().await = Some(snapshot);

        let build_stats = BuildStats {
            documents_indexed: stats.document_count,
            documents_skipped: skipped,
            embedding_dimension: stats.dimension,
            collections: stats.collections,
            build_duration_ms: started.elapsed().as_millis() as u64,
            built_at: Utc::now(),
        };
        log::info!(
            "Indexed {} documents ({} skipped, dimension {}) in {}ms",
            build_stats.documents_indexed,
            build_stats.documents_skipped,
            build_stats.embedding_dimension,
            build_stats.build_duration_ms
        );
        Ok(build_stats)
    }

    /// Read the snapshot from disk, replacing the in-memory one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIndex`] if any snapshot file is absent; see
    /// [`load_snapshot`] for the rest.
    pub async fn load(&self) -> Result<()> {
        let _gate = self.writer.lock().await;
        self.load_locked().await.map(|_| ())
    }

    /// Load while already holding the writer gate.
    async fn load_locked(&self) -> Result<Arc<Snapshot>> {
        let config = self.config.clone();
        let snapshot = tokio::task::spawn_blocking(move || load_snapshot(&config))
            .await
            .map_err(|e| Error::operation(format!("snapshot load task failed: {e}")))??;

        let snapshot = Arc::new(snapshot);
        *self.state.write().await = Some(Arc::clone(&snapshot));
        log::info!(
            "Loaded index of {} documents from {}",
            snapshot.len(),
            self.config.index_path.display()
        );
        Ok(snapshot)
    }

    async fn persist(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || save_snapshot(&config, &snapshot))
            .await
            .map_err(|e| Error::operation(format!("snapshot write task failed: {e}")))?
    }

    async fn current(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.clone()
    }

    /// The loaded snapshot, loading it from disk on first use.
    async fn current_or_load(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }

        let _gate = self.writer.lock().await;
        // Another task may have loaded or built while we waited.
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.load_locked().await.map_err(|e| match e {
            Error::MissingIndex(msg) => {
                Error::missing_index(format!("build the index first ({msg})"))
            }
            other => other,
        })
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Retrieve the stored snippets nearest to `query`.
    ///
    /// Hits come back closest first. With
    /// [`SearchStrategy::RankThenFilter`] the collection filter is applied
    /// to the `top_k` nearest candidates only, so fewer than `top_k` hits
    /// (possibly none) is a normal outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidData`] if `request.top_k` is zero
    /// - [`Error::MissingIndex`] if nothing is built and no snapshot is on disk
    /// - [`Error::DimensionMismatch`] if the query embedding does not fit the index
    pub async fn search(&self, query: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        if request.top_k == 0 {
            return Err(Error::invalid_data("top_k must be at least 1"));
        }

        let snapshot = self.current_or_load().await?;
        let embedding = self.provider.embed(query).await?;

        let hits = match request.strategy {
            SearchStrategy::RankThenFilter => {
                let neighbors = snapshot.index.search(&embedding, request.top_k)?;
                self.assemble(&snapshot, &neighbors, request)?
            }
            SearchStrategy::ExpandUntilFilled => {
                self.search_expanding(&snapshot, &embedding, request)?
            }
        };

        log::debug!(
            "Search returned {} hit(s) for top_k={} ({} filter collections)",
            hits.len(),
            request.top_k,
            request.collection_filter.collections().count()
        );
        Ok(hits)
    }

    fn search_expanding(
        &self,
        snapshot: &Snapshot,
        embedding: &[f32],
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>> {
        let total = snapshot.len();
        let mut window = request.top_k;
        loop {
            let neighbors = snapshot.index.search(embedding, window)?;
            let mut hits = self.assemble(snapshot, &neighbors, request)?;
            if hits.len() >= request.top_k || window >= total {
                hits.truncate(request.top_k);
                return Ok(hits);
            }
            window = window.saturating_mul(2).min(total);
        }
    }

    /// Turn ranked neighbors into hits, dropping those outside the filter.
    fn assemble(
        &self,
        snapshot: &Snapshot,
        neighbors: &[Neighbor],
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let (metadata, text) = match lookup(snapshot, neighbor.position) {
                Ok(found) => found,
                Err(err) => match self.config.drift_policy {
                    DriftPolicy::Strict => return Err(err),
                    DriftPolicy::Lenient => {
                        log::warn!("Skipping candidate at position {}: {err}", neighbor.position);
                        continue;
                    }
                },
            };
            if !request.collection_filter.matches(&metadata.collection_name) {
                continue;
            }
            hits.push(SearchHit {
                text: text.to_string(),
                collection: metadata.collection_name.clone(),
                metadata: metadata.clone(),
                score: request.include_scores.then_some(neighbor.distance),
            });
        }
        Ok(hits)
    }
}

fn lookup(snapshot: &Snapshot, position: usize) -> Result<(&MetadataEntry, &str)> {
    let metadata = snapshot.metadata.get(position)?;
    let text = snapshot
        .texts
        .get(position)
        .ok_or(Error::IndexOutOfRange {
            index: position,
            len: snapshot.texts.len(),
        })?;
    Ok((metadata, text.as_str()))
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
