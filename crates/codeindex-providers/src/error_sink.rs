//! An in-memory error sink fake: entries accumulate in a `Vec` so tests can
//! assert on what got logged.

use async_trait::async_trait;
use codeindex_domain::error::Result;
use codeindex_domain::ports::{ErrorLogEntry, ErrorSink};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryErrorSink {
    entries: Mutex<Vec<ErrorLogEntry>>,
}

impl InMemoryErrorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<ErrorLogEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ErrorSink for InMemoryErrorSink {
    async fn log(&self, entry: ErrorLogEntry) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
