//! File hash cache port: `filePath -> hex SHA-256`, owned by the scanner,
//! persisted by the host.

use async_trait::async_trait;

use crate::error::Result;

/// Required hash-cache operations.
#[async_trait]
pub trait HashCache: Send + Sync {
    /// Look up the cached hash for a file path.
    async fn get_hash(&self, file_path: &str) -> Result<Option<String>>;

    /// Return every cached `(file_path, hash)` pair.
    async fn get_all_hashes(&self) -> Result<Vec<(String, String)>>;

    /// Record the hash for a file path.
    async fn update_hash(&self, file_path: &str, hash: &str) -> Result<()>;

    /// Forget a file path entirely.
    async fn delete_hash(&self, file_path: &str) -> Result<()>;
}
