use std::fs;
use std::sync::Arc;
use std::time::Duration;

use codeindex_domain::ports::{Bm25Index, HashCache, VectorStore};
use codeindex_infrastructure::graph::{GraphService, GraphServiceConfig};
use codeindex_infrastructure::pipeline::batch::BatchAccumulatorConfig;
use codeindex_infrastructure::pipeline::scanner::{ScanConfig, Scanner};
use codeindex_infrastructure::state::StateManager;
use codeindex_providers::{
    DeterministicEmbedder, InMemoryBm25Index, InMemoryErrorSink, InMemoryGraphDriver,
    InMemoryHashCache, InMemoryVectorStore, SingleBlockParser,
};
use tempfile::tempdir;

fn fast_graph_config() -> GraphServiceConfig {
    let mut config = GraphServiceConfig::default();
    config.query_timeout = Duration::from_secs(5);
    config.health.interval = Duration::from_secs(3600);
    config.retry.max_retries = 0;
    config
}

struct Fixture {
    scanner: Scanner,
    vector_store: Arc<InMemoryVectorStore>,
    bm25: Arc<InMemoryBm25Index>,
    hash_cache: Arc<InMemoryHashCache>,
    graph_driver: Arc<InMemoryGraphDriver>,
}

fn build_fixture(root: &std::path::Path) -> Fixture {
    let hash_cache = Arc::new(InMemoryHashCache::new());
    let vector_store = Arc::new(InMemoryVectorStore::new());
    let bm25 = Arc::new(InMemoryBm25Index::new());
    let graph_driver = Arc::new(InMemoryGraphDriver::new());
    let graph = Arc::new(GraphService::new(
        Arc::clone(&graph_driver) as Arc<dyn codeindex_domain::ports::GraphDriver>,
        fast_graph_config(),
    ));

    let scanner = Scanner::new(
        ScanConfig {
            root: root.to_path_buf(),
            extensions: vec!["rs".to_owned()],
            max_file_size_bytes: 1_000_000,
            batch: BatchAccumulatorConfig {
                segment_threshold: 100,
                max_pending_batches: 4,
            },
        },
        Arc::clone(&hash_cache) as Arc<dyn HashCache>,
        Arc::new(SingleBlockParser),
        Arc::new(DeterministicEmbedder::new()),
        Arc::clone(&vector_store) as Arc<dyn VectorStore>,
        Arc::clone(&bm25) as Arc<dyn Bm25Index>,
        graph,
        Arc::new(InMemoryErrorSink::new()),
        Arc::new(StateManager::new()),
    );

    Fixture {
        scanner,
        vector_store,
        bm25,
        hash_cache,
        graph_driver,
    }
}

#[tokio::test]
async fn new_file_produces_one_vector_point_and_one_graph_node() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("lib.rs"), "fn main() {}\n").unwrap();

    let fixture = build_fixture(dir.path());
    let stats = fixture.scanner.scan().await.unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.skipped, 0);
    assert_eq!(fixture.vector_store.len().await, 1);
    assert_eq!(fixture.bm25.document_count().await, 1);
    assert_eq!(fixture.graph_driver.node_count().await, 1);
}

#[tokio::test]
async fn unchanged_workspace_is_skipped_on_second_scan() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("lib.rs"), "fn main() {}\n").unwrap();

    let fixture = build_fixture(dir.path());
    let first = fixture.scanner.scan().await.unwrap();
    assert_eq!(first.processed, 1);

    let second = fixture.scanner.scan().await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
    // The hash cache is untouched, and the stores keep exactly the one entry
    // the first scan produced; nothing is re-embedded or re-upserted.
    assert_eq!(fixture.vector_store.len().await, 1);
    assert_eq!(fixture.graph_driver.node_count().await, 1);
}

#[tokio::test]
async fn edited_file_replaces_its_own_graph_nodes_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
    fs::write(dir.path().join("b.rs"), "fn b() {}\n").unwrap();

    let fixture = build_fixture(dir.path());
    fixture.scanner.scan().await.unwrap();
    assert_eq!(fixture.graph_driver.node_count().await, 2);

    fs::write(dir.path().join("a.rs"), "fn a() { changed(); }\n").unwrap();
    let stats = fixture.scanner.scan().await.unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(fixture.graph_driver.node_count().await, 2);
}

#[tokio::test]
async fn removed_file_is_deleted_from_the_vector_store_and_hash_cache() {
    let dir = tempdir().unwrap();
    let doomed = dir.path().join("doomed.rs");
    fs::write(&doomed, "fn gone() {}\n").unwrap();

    let fixture = build_fixture(dir.path());
    fixture.scanner.scan().await.unwrap();
    assert_eq!(fixture.vector_store.len().await, 1);

    fs::remove_file(&doomed).unwrap();
    let stats = fixture.scanner.scan().await.unwrap();

    assert_eq!(stats.deleted, 1);
    assert_eq!(fixture.vector_store.len().await, 0);
    assert!(fixture.hash_cache.get_hash("doomed.rs").await.unwrap().is_none());
}

#[tokio::test]
async fn non_matching_extensions_are_never_walked() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "not rust\n").unwrap();

    let fixture = build_fixture(dir.path());
    let stats = fixture.scanner.scan().await.unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.skipped, 0);
    assert_eq!(fixture.vector_store.len().await, 0);
}

#[tokio::test]
async fn graph_outage_still_lets_vector_and_bm25_writes_through() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();

    let fixture = build_fixture(dir.path());
    fixture.graph_driver.set_healthy(false);

    let stats = fixture.scanner.scan().await.unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.graph_failures, 1);
    assert_eq!(fixture.vector_store.len().await, 1);
    assert_eq!(fixture.bm25.document_count().await, 1);
    assert_eq!(fixture.graph_driver.node_count().await, 0);
}
