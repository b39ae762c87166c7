//! Directory scanner and dual-store ingestion pipeline.
//!
//! Walks a workspace respecting `.ignore` semantics, hashes survivors, skips
//! unchanged files, parses changed files, accumulates blocks into batches,
//! embeds + upserts to the vector store and BM25 index, and delegates each
//! file's graph update under a cross-batch file mutex. A pipeline-local
//! circuit breaker protects the graph side independently of the graph
//! service's own breaker: three consecutive graph-indexing failures skip
//! graph writes for five minutes while vector/BM25 writes keep going.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use codeindex_domain::constants::{
    DEFAULT_MAX_FILE_SIZE_BYTES, GRAPH_PIPELINE_BREAKER_TIMEOUT_MS,
    GRAPH_PIPELINE_BREAKER_TRIP_THRESHOLD,
};
use codeindex_domain::entities::CodeNode;
use codeindex_domain::error::{Error, Result};
use codeindex_domain::ports::{Bm25Index, Embedder, ErrorLogEntry, ErrorSink, HashCache, Parser};
use codeindex_domain::value_objects::{SubsystemStatus, VectorPoint};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, warn};

use crate::graph::GraphService;
use crate::state::StateManager;

use super::batch::{Batch, BatchAccumulator, BatchAccumulatorConfig};

/// Tunables controlling the scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub max_file_size_bytes: u64,
    pub batch: BatchAccumulatorConfig,
}

/// Aggregate statistics from one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub processed: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub total_block_count: u64,
    pub graph_failures: u64,
}

struct GraphPipelineBreaker {
    consecutive_failures: AtomicU32,
    tripped_until: AsyncMutex<Option<Instant>>,
}

impl GraphPipelineBreaker {
    fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            tripped_until: AsyncMutex::new(None),
        }
    }

    async fn is_tripped(&self) -> bool {
        let guard = self.tripped_until.lock().await;
        matches!(*guard, Some(until) if Instant::now() < until)
    }

    async fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    async fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= GRAPH_PIPELINE_BREAKER_TRIP_THRESHOLD {
            let mut guard = self.tripped_until.lock().await;
            *guard = Some(Instant::now() + Duration::from_millis(GRAPH_PIPELINE_BREAKER_TIMEOUT_MS));
            warn!("graph pipeline breaker tripped, skipping graph writes for 5 minutes");
        }
    }
}

/// The scanner / pipeline.
pub struct Scanner {
    config: ScanConfig,
    hash_cache: Arc<dyn HashCache>,
    parser: Arc<dyn Parser>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn codeindex_domain::ports::VectorStore>,
    bm25: Arc<dyn Bm25Index>,
    graph: Arc<GraphService>,
    error_sink: Arc<dyn ErrorSink>,
    state: Arc<StateManager>,
    file_mutex: AsyncMutex<()>,
    graph_breaker: GraphPipelineBreaker,
    cancelled: Arc<AtomicBool>,
}

#[allow(clippy::too_many_arguments)]
impl Scanner {
    #[must_use]
    pub fn new(
        config: ScanConfig,
        hash_cache: Arc<dyn HashCache>,
        parser: Arc<dyn Parser>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn codeindex_domain::ports::VectorStore>,
        bm25: Arc<dyn Bm25Index>,
        graph: Arc<GraphService>,
        error_sink: Arc<dyn ErrorSink>,
        state: Arc<StateManager>,
    ) -> Self {
        Self {
            config,
            hash_cache,
            parser,
            embedder,
            vector_store,
            bm25,
            graph,
            error_sink,
            state,
            file_mutex: AsyncMutex::new(()),
            graph_breaker: GraphPipelineBreaker::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cooperative cancellation; in-flight batches complete, no new
    /// ones are started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.config.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    fn walk(&self) -> Vec<PathBuf> {
        let mut builder = ignore::WalkBuilder::new(&self.config.root);
        builder.hidden(false);
        let mut files = Vec::new();
        for entry in builder.build().flatten() {
            let path = entry.path();
            if path.is_file() && self.has_supported_extension(path) {
                files.push(path.to_path_buf());
            }
        }
        files
    }

    /// Run one full scan, returning aggregate statistics.
    pub async fn scan(&self) -> Result<ScanStats> {
        self.state.set_vector_status(SubsystemStatus::Indexing);
        self.state.set_graph_status(SubsystemStatus::Indexing);

        let files = self.walk();
        let previous_hashes: HashMap<String, String> =
            self.hash_cache.get_all_hashes().await?.into_iter().collect();
        let mut processed_paths: HashSet<String> = HashSet::new();
        let accumulator = Arc::new(BatchAccumulator::new(self.config.batch.clone()));
        let mut stats = ScanStats::default();

        for path in &files {
            if self.is_cancelled() {
                break;
            }
            let rel_path = path
                .strip_prefix(&self.config.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            let metadata = match tokio::fs::metadata(path).await {
                Ok(m) => m,
                Err(e) => {
                    self.report_error("scan", &rel_path, &e.to_string()).await;
                    continue;
                }
            };
            if metadata.len() > self.config.max_file_size_bytes.max(DEFAULT_MAX_FILE_SIZE_BYTES) {
                stats.skipped += 1;
                continue;
            }

            let content = match tokio::fs::read_to_string(path).await {
                Ok(c) => c,
                Err(e) => {
                    self.report_error("read", &rel_path, &e.to_string()).await;
                    continue;
                }
            };
            let file_hash = hex_sha256(content.as_bytes());

            if previous_hashes.get(&rel_path) == Some(&file_hash) {
                stats.skipped += 1;
                processed_paths.insert(rel_path);
                continue;
            }

            let blocks = match self.parser.parse_file(&rel_path, &content, &file_hash).await {
                Ok(b) => b,
                Err(e) => {
                    self.report_error("parse", &rel_path, &e.to_string()).await;
                    continue;
                }
            };

            stats.total_block_count += blocks.len() as u64;
            processed_paths.insert(rel_path.clone());

            if let Err(e) = self.hash_cache.update_hash(&rel_path, &file_hash).await {
                self.report_error("update_hash", &rel_path, &e.to_string()).await;
            }

            if let Some(sealed) = accumulator.append_file(blocks).await {
                match self.process_batch(sealed).await {
                    Ok(graph_failed) => {
                        if graph_failed {
                            stats.graph_failures += 1;
                        }
                    }
                    Err(e) => return Err(e),
                }
                accumulator.complete_one().await;
            }

            stats.processed += 1;
            self.state
                .report_progress(stats.processed, Some(files.len() as u64), None);
        }

        if let Some(remainder) = accumulator.flush_remainder().await {
            match self.process_batch(remainder).await {
                Ok(graph_failed) => {
                    if graph_failed {
                        stats.graph_failures += 1;
                    }
                }
                Err(e) => return Err(e),
            }
            accumulator.complete_one().await;
        }

        // Deletion pass: anything in the previous hash map but not seen this run.
        for (path, _) in previous_hashes.iter() {
            if !processed_paths.contains(path) {
                if let Err(e) = self.vector_store.delete_points_by_file_path(path).await {
                    self.report_error("delete_vector_points", path, &e.to_string()).await;
                } else {
                    stats.deleted += 1;
                }
                self.hash_cache.delete_hash(path).await.ok();
            }
        }

        self.state.set_vector_status(SubsystemStatus::Indexed);
        self.state.set_graph_status(SubsystemStatus::Indexed);
        Ok(stats)
    }

    async fn process_batch(&self, batch: Batch) -> Result<bool> {
        let mut graph_failed_this_batch = false;
        if batch.blocks.is_empty() {
            return Ok(false);
        }

        let texts: Vec<String> = batch.blocks.iter().map(|b| b.content.clone()).collect();
        let embeddings = self.embedder.create_embeddings(&texts).await?;

        let points: Vec<VectorPoint> = batch
            .blocks
            .iter()
            .zip(embeddings.into_iter())
            .map(|(block, vector)| VectorPoint::from_block(block, vector))
            .collect();
        self.vector_store.upsert_points(points).await?;

        let documents: Vec<(String, String)> = batch
            .blocks
            .iter()
            .map(|b| (b.segment_hash.clone(), b.content.clone()))
            .collect();
        self.bm25.feed_documents(&documents).await?;

        let mut by_file: HashMap<String, Vec<&codeindex_domain::entities::CodeBlock>> = HashMap::new();
        for block in &batch.blocks {
            by_file.entry(block.file_path.clone()).or_default().push(block);
        }

        if self.graph_breaker.is_tripped().await {
            graph_failed_this_batch = true;
        } else {
            for (file_path, blocks) in by_file {
                let _guard = self.file_mutex.lock().await;
                match self.replace_file_nodes(&file_path, &blocks).await {
                    Ok(()) => self.graph_breaker.record_success().await,
                    Err(e) => {
                        graph_failed_this_batch = true;
                        self.graph_breaker.record_failure().await;
                        self.report_error("graph_index", &file_path, &e.to_string()).await;
                        if matches!(e, Error::Authentication { .. }) {
                            error!("critical graph authentication failure, aborting scan");
                            self.cancel();
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(graph_failed_this_batch)
    }

    async fn replace_file_nodes(
        &self,
        file_path: &str,
        blocks: &[&codeindex_domain::entities::CodeBlock],
    ) -> Result<()> {
        self.graph.delete_nodes_by_file_path(file_path).await?;
        for block in blocks {
            let node = CodeNode {
                id: block.segment_hash.clone(),
                node_type: block.kind,
                name: block.identifier.clone(),
                file_path: block.file_path.clone(),
                start_line: block.start_line,
                end_line: block.end_line,
                language: block.language.clone(),
            };
            self.graph.upsert_node(&node).await?;
        }
        Ok(())
    }

    async fn report_error(&self, operation: &str, file_path: &str, message: &str) {
        warn!(operation, file_path, error = message, "scan error");
        let entry = ErrorLogEntry {
            timestamp: chrono::Utc::now(),
            service: "scanner".to_owned(),
            file_path: Some(file_path.to_owned()),
            operation: operation.to_owned(),
            error: message.to_owned(),
            stack: None,
            block_type: None,
            block_identifier: None,
            node_id: None,
            additional_context: None,
        };
        if let Err(e) = self.error_sink.log(entry).await {
            error!(error = %e, "failed to log scan error to the error sink");
        }
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
