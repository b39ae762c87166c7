//! An in-memory BM25 index fake: just remembers which document ids came
//! from which text, without computing actual term scores.

use std::collections::HashMap;

use async_trait::async_trait;
use codeindex_domain::error::Result;
use codeindex_domain::ports::Bm25Index;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryBm25Index {
    documents: Mutex<HashMap<String, String>>,
}

impl InMemoryBm25Index {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }
}

#[async_trait]
impl Bm25Index for InMemoryBm25Index {
    async fn feed_documents(&self, documents: &[(String, String)]) -> Result<()> {
        let mut guard = self.documents.lock().await;
        for (id, text) in documents {
            guard.insert(id.clone(), text.clone());
        }
        Ok(())
    }

    async fn delete_by_file_path(&self, file_path: &str) -> Result<()> {
        self.documents.lock().await.retain(|id, _| !id.starts_with(file_path));
        Ok(())
    }
}
