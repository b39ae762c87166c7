//! Durable error log sink.
//!
//! Appends structured error entries to a durable JSON-lines file with a
//! bounded-buffer + periodic-flush policy: flush at 100 entries or 5 seconds,
//! whichever comes first.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use codeindex_domain::constants::{ERROR_LOG_BUFFER_CAPACITY, ERROR_LOG_FLUSH_INTERVAL_MS};
use codeindex_domain::error::Result;
use codeindex_domain::ports::{ErrorLogEntry, ErrorSink};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// JSON-lines file sink for structured error entries.
pub struct FileErrorSink {
    path: PathBuf,
    buffer: Arc<Mutex<Vec<ErrorLogEntry>>>,
}

impl FileErrorSink {
    /// Create a sink writing to `path`, creating parent directories on demand.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            buffer: Arc::new(Mutex::new(Vec::with_capacity(ERROR_LOG_BUFFER_CAPACITY))),
        }
    }

    /// Spawn the background task that flushes the buffer every
    /// `ERROR_LOG_FLUSH_INTERVAL_MS`. The returned handle should be aborted on
    /// shutdown.
    pub fn spawn_periodic_flush(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let sink = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(ERROR_LOG_FLUSH_INTERVAL_MS));
            loop {
                interval.tick().await;
                if let Err(e) = sink.flush().await {
                    error!(error = %e, "periodic error-log flush failed");
                }
            }
        })
    }

    async fn write_batch(&self, batch: &[ErrorLogEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut payload = String::new();
        for entry in batch {
            payload.push_str(&serde_json::to_string(entry)?);
            payload.push('\n');
        }
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ErrorSink for FileErrorSink {
    async fn log(&self, entry: ErrorLogEntry) -> Result<()> {
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(entry);
            buffer.len() >= ERROR_LOG_BUFFER_CAPACITY
        };
        if should_flush {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let batch = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };
        if batch.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.write_batch(&batch).await {
            // Re-add the batch we just took (not whatever has accumulated in the
            // buffer since) so entries already queued by a concurrent `log()`
            // call aren't lost or duplicated.
            warn!(error = %e, count = batch.len(), "error-log flush failed, re-queuing batch");
            let mut buffer = self.buffer.lock().await;
            let mut restored = batch;
            restored.append(&mut buffer);
            *buffer = restored;
            return Err(e);
        }
        Ok(())
    }
}
