//! Handler functions for the index commands: build, search, status.
//!
//! Each command has a data function (returns values, used by tests) and a
//! `handle_*` wrapper that prints.

use std::path::{Path, PathBuf};

use lifelog_core::Result;
use lifelog_ingest::CorpusLoader;
use lifelog_vector::{
    BuildStats, IndexStatus, Retriever, SearchHit, SearchRequest, SearchStrategy, SnapshotStats,
    create_embedding_provider,
};
use serde::Serialize;

use crate::cli::SearchArgs;
use crate::config::LifelogConfig;

/// Construct a retriever from the configured embedder and index paths.
pub fn open_retriever(config: &LifelogConfig) -> Result<Retriever> {
    let provider = create_embedding_provider(&config.embedder)?;
    Ok(Retriever::new(provider, config.index.clone()))
}

// ============================================================================
// Build
// ============================================================================

/// Load the data directory and rebuild the index.
pub async fn build_index(config: &LifelogConfig, data: Option<&Path>) -> Result<BuildStats> {
    let data_dir = data.unwrap_or(config.ingest.data_dir.as_path());
    let documents = CorpusLoader::from_config(&config.ingest)?
        .load(data_dir)
        .await?;
    tracing::debug!(documents = documents.len(), "corpus loaded");

    open_retriever(config)?.build(&documents).await
}

/// `lifelog build`
pub async fn handle_build(config: &LifelogConfig, data: Option<PathBuf>) -> Result<()> {
    let stats = build_index(config, data.as_deref()).await?;

    println!(
        "Indexed {} documents ({} skipped, dimension {}) in {}ms",
        stats.documents_indexed,
        stats.documents_skipped,
        stats.embedding_dimension,
        stats.build_duration_ms
    );
    for (collection, count) in &stats.collections {
        println!("  {collection:<20} {count}");
    }
    println!("Index written to {}", config.index.index_path.display());
    Ok(())
}

// ============================================================================
// Search
// ============================================================================

/// Translate CLI flags into a request, filling gaps from config.
pub fn search_request(config: &LifelogConfig, args: &SearchArgs) -> SearchRequest {
    let strategy = if args.expand {
        SearchStrategy::ExpandUntilFilled
    } else {
        config.index.strategy
    };
    let mut request = SearchRequest::new(args.top_k.unwrap_or(config.index.default_top_k))
        .with_collections(args.collections.clone())
        .with_strategy(strategy);
    if args.scores {
        request = request.with_scores();
    }
    request
}

/// Run a search against the persisted index.
pub async fn search_index(config: &LifelogConfig, args: &SearchArgs) -> Result<Vec<SearchHit>> {
    let request = search_request(config, args);
    open_retriever(config)?.search(&args.query, &request).await
}

/// `lifelog search`
pub async fn handle_search(config: &LifelogConfig, args: SearchArgs) -> Result<()> {
    let hits = search_index(config, &args).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for hit in &hits {
        match hit.score {
            Some(score) => println!("\n[From: {}] (distance {score:.4})", hit.collection),
            None => println!("\n[From: {}]", hit.collection),
        }
        println!("{}", hit.text);
    }
    Ok(())
}

// ============================================================================
// Status
// ============================================================================

/// What `lifelog status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: IndexStatus,
    pub index_path: PathBuf,
    pub stats: Option<SnapshotStats>,
}

/// Inspect the persisted index without building it.
pub async fn index_status(config: &LifelogConfig) -> Result<StatusReport> {
    let retriever = open_retriever(config)?;
    match retriever.load().await {
        Ok(()) => {}
        Err(e) if e.is_missing_index() => tracing::debug!("no snapshot on disk: {e}"),
        Err(e) => return Err(e),
    }
    Ok(StatusReport {
        status: retriever.status().await,
        index_path: config.index.index_path.clone(),
        stats: retriever.stats().await,
    })
}

/// `lifelog status`
pub async fn handle_status(config: &LifelogConfig) -> Result<()> {
    let report = index_status(config).await?;

    println!("Index:  {}", report.index_path.display());
    println!("Status: {}", report.status);
    match &report.stats {
        Some(stats) => {
            println!("Documents: {}", stats.document_count);
            println!("Dimension: {}", stats.dimension);
            for (collection, count) in &stats.collections {
                println!("  {collection:<20} {count}");
            }
        }
        None => println!("No index found. Run `lifelog build` first."),
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lifelog_vector::{EmbedderConfig, RetrieverConfig};
    use tempfile::tempdir;

    fn test_config(root: &Path) -> LifelogConfig {
        let data_dir = root.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(
            data_dir.join("wearable.json"),
            r#"[
                {"date": "2025-04-27", "avg_heart_rate": 72, "steps_taken": 8450,
                 "sleep_duration_hrs": 6.1, "mood": "tired"},
                {"date": "2025-04-28", "avg_heart_rate": 64, "steps_taken": 10200,
                 "sleep_duration_hrs": 7.4, "mood": "rested"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            data_dir.join("location_data.json"),
            r#"[{"place": "Green Bean Cafe", "time": "2025-04-27T09:45"}]"#,
        )
        .unwrap();

        let mut config = LifelogConfig {
            index: RetrieverConfig::in_dir(root.join("index")),
            embedder: EmbedderConfig::mock(64),
            ..Default::default()
        };
        config.ingest.data_dir = data_dir;
        config
    }

    fn search_args(query: &str) -> SearchArgs {
        SearchArgs {
            query: query.to_string(),
            top_k: None,
            collections: Vec::new(),
            scores: false,
            expand: false,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_build_then_search() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let stats = build_index(&config, None).await.unwrap();
        assert_eq!(stats.documents_indexed, 3);
        assert_eq!(stats.collections.get("wearable"), Some(&2));

        let mut args = search_args("average heart rate sleep");
        args.collections = vec!["wearable".to_string()];
        let hits = search_index(&config, &args).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.collection == "wearable"));
    }

    #[tokio::test]
    async fn test_build_with_data_override() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        let data_dir = config.ingest.data_dir.clone();
        config.ingest.data_dir = dir.path().join("elsewhere");

        let stats = build_index(&config, Some(&data_dir)).await.unwrap();
        assert_eq!(stats.documents_indexed, 3);
    }

    #[tokio::test]
    async fn test_search_before_build_is_missing_index() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let err = search_index(&config, &search_args("sleep")).await.unwrap_err();
        assert!(err.is_missing_index());
    }

    #[tokio::test]
    async fn test_status_before_and_after_build() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let before = index_status(&config).await.unwrap();
        assert_eq!(before.status, IndexStatus::Empty);
        assert!(before.stats.is_none());

        build_index(&config, None).await.unwrap();
        let after = index_status(&config).await.unwrap();
        assert_eq!(after.status, IndexStatus::Ready);
        let stats = after.stats.unwrap();
        assert_eq!(stats.document_count, 3);
        assert_eq!(stats.collections.get("location_data"), Some(&1));
    }

    #[test]
    fn test_search_request_from_flags() {
        let config = LifelogConfig::default();
        let mut args = search_args("q");
        let request = search_request(&config, &args);
        assert_eq!(request.top_k, 5);
        assert_eq!(request.strategy, SearchStrategy::RankThenFilter);
        assert!(!request.include_scores);

        args.top_k = Some(2);
        args.expand = true;
        args.scores = true;
        args.collections = vec!["Wearable".to_string()];
        let request = search_request(&config, &args);
        assert_eq!(request.top_k, 2);
        assert_eq!(request.strategy, SearchStrategy::ExpandUntilFilled);
        assert!(request.include_scores);
        assert!(request.collection_filter.matches("wearable"));
    }
}
