//! Batch accumulator: collects parsed blocks from many files into fixed-size
//! batches for embedding/upsert, without ever splitting one file's blocks
//! across two batches.

use std::sync::Arc;

use codeindex_domain::constants::{DEFAULT_BATCH_SEGMENT_THRESHOLD, DEFAULT_MAX_PENDING_BATCHES};
use codeindex_domain::entities::CodeBlock;
use tokio::sync::{Mutex, Notify};

/// One sealed batch: every block from the files that happened to be appended
/// before the threshold was crossed.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub blocks: Vec<CodeBlock>,
}

struct Inner {
    current: Vec<CodeBlock>,
    pending: usize,
}

/// Tunables for the accumulator.
#[derive(Debug, Clone, Copy)]
pub struct BatchAccumulatorConfig {
    pub segment_threshold: usize,
    pub max_pending_batches: usize,
}

impl Default for BatchAccumulatorConfig {
    fn default() -> Self {
        Self {
            segment_threshold: DEFAULT_BATCH_SEGMENT_THRESHOLD,
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
        }
    }
}

/// Mutex-guarded batch accumulator with pending-batch backpressure.
pub struct BatchAccumulator {
    config: BatchAccumulatorConfig,
    inner: Mutex<Inner>,
    pending_completed: Notify,
}

impl BatchAccumulator {
    #[must_use]
    pub fn new(config: BatchAccumulatorConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                current: Vec::new(),
                pending: 0,
            }),
            pending_completed: Notify::new(),
        }
    }

    /// Atomically append one file's blocks. If this append crosses the
    /// segment threshold, the current batch is sealed and returned (the
    /// accumulator resets to empty and `pending` is incremented). Blocks past
    /// the threshold boundary within the SAME file append still land in the
    /// same sealed batch — a file is never split.
    ///
    /// Applies backpressure: if `pending >= max_pending_batches` before
    /// sealing a new one, this call awaits [`BatchAccumulator::complete_one`]
    /// being called by a consumer before proceeding.
    pub async fn append_file(self: &Arc<Self>, blocks: Vec<CodeBlock>) -> Option<Batch> {
        loop {
            {
                let pending = self.inner.lock().await.pending;
                if pending < self.config.max_pending_batches {
                    break;
                }
            }
            self.pending_completed.notified().await;
        }

        let mut inner = self.inner.lock().await;
        inner.current.extend(blocks);
        if inner.current.len() >= self.config.segment_threshold {
            let sealed = std::mem::take(&mut inner.current);
            inner.pending += 1;
            return Some(Batch { blocks: sealed });
        }
        None
    }

    /// Seal and return whatever remains in the current batch, regardless of
    /// whether it has reached the threshold (called once scanning finishes).
    pub async fn flush_remainder(&self) -> Option<Batch> {
        let mut inner = self.inner.lock().await;
        if inner.current.is_empty() {
            return None;
        }
        let sealed = std::mem::take(&mut inner.current);
        inner.pending += 1;
        Some(Batch { blocks: sealed })
    }

    /// Mark one in-flight batch as completed, releasing one unit of
    /// backpressure.
    pub async fn complete_one(&self) {
        let mut inner = self.inner.lock().await;
        inner.pending = inner.pending.saturating_sub(1);
        drop(inner);
        self.pending_completed.notify_one();
    }

    /// Current pending-batch count, for metrics/testing.
    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str) -> CodeBlock {
        CodeBlock {
            segment_hash: id.to_owned(),
            file_path: "f.rs".to_owned(),
            content: String::new(),
            start_line: 0,
            end_line: 1,
            file_hash: "h".to_owned(),
            identifier: id.to_owned(),
            kind: codeindex_domain::entities::NodeType::Function,
            language: None,
            symbol_metadata: None,
            documentation: None,
            lsp_type_info: None,
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    #[tokio::test]
    async fn seals_once_threshold_is_reached() {
        let accumulator = Arc::new(BatchAccumulator::new(BatchAccumulatorConfig {
            segment_threshold: 2,
            max_pending_batches: 4,
        }));
        assert!(accumulator.append_file(vec![block("a")]).await.is_none());
        let sealed = accumulator.append_file(vec![block("b")]).await;
        assert!(sealed.is_some());
        assert_eq!(sealed.unwrap().blocks.len(), 2);
    }

    #[tokio::test]
    async fn one_file_is_never_split_across_batches() {
        let accumulator = Arc::new(BatchAccumulator::new(BatchAccumulatorConfig {
            segment_threshold: 2,
            max_pending_batches: 4,
        }));
        let sealed = accumulator
            .append_file(vec![block("a"), block("b"), block("c")])
            .await;
        assert_eq!(sealed.unwrap().blocks.len(), 3);
    }

    #[tokio::test]
    async fn flush_remainder_returns_partial_batch() {
        let accumulator = Arc::new(BatchAccumulator::new(BatchAccumulatorConfig::default()));
        accumulator.append_file(vec![block("a")]).await;
        let remainder = accumulator.flush_remainder().await;
        assert_eq!(remainder.unwrap().blocks.len(), 1);
        assert!(accumulator.flush_remainder().await.is_none());
    }

    #[tokio::test]
    async fn backpressure_blocks_until_a_batch_completes() {
        let accumulator = Arc::new(BatchAccumulator::new(BatchAccumulatorConfig {
            segment_threshold: 1,
            max_pending_batches: 1,
        }));
        accumulator.append_file(vec![block("a")]).await;
        assert_eq!(accumulator.pending_count().await, 1);

        let accumulator_clone = Arc::clone(&accumulator);
        let handle = tokio::spawn(async move { accumulator_clone.append_file(vec![block("b")]).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        accumulator.complete_one().await;
        let sealed = handle.await.unwrap();
        assert!(sealed.is_some());
    }
}
