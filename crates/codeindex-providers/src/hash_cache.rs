//! An in-memory file-hash cache fake.

use std::collections::HashMap;

use async_trait::async_trait;
use codeindex_domain::error::Result;
use codeindex_domain::ports::HashCache;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryHashCache {
    hashes: Mutex<HashMap<String, String>>,
}

impl InMemoryHashCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache, as if a previous scan had already populated it.
    pub async fn seed(&self, file_path: impl Into<String>, hash: impl Into<String>) {
        self.hashes.lock().await.insert(file_path.into(), hash.into());
    }
}

#[async_trait]
impl HashCache for InMemoryHashCache {
    async fn get_hash(&self, file_path: &str) -> Result<Option<String>> {
        Ok(self.hashes.lock().await.get(file_path).cloned())
    }

    async fn get_all_hashes(&self) -> Result<Vec<(String, String)>> {
        Ok(self.hashes.lock().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn update_hash(&self, file_path: &str, hash: &str) -> Result<()> {
        self.hashes.lock().await.insert(file_path.to_owned(), hash.to_owned());
        Ok(())
    }

    async fn delete_hash(&self, file_path: &str) -> Result<()> {
        self.hashes.lock().await.remove(file_path);
        Ok(())
    }
}
