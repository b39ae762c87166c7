//! Vector store port: upserts/deletes points by id and by file path. The
//! concrete backend (e.g. Qdrant) is an external collaborator; only this
//! interface lives in this crate.

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::VectorPoint;

/// Required vector-store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert a batch of points.
    async fn upsert_points(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// Delete every point belonging to a file path.
    async fn delete_points_by_file_path(&self, file_path: &str) -> Result<()>;

    /// Delete every point belonging to any of the given file paths.
    async fn delete_points_by_multiple_file_paths(&self, file_paths: &[String]) -> Result<()>;

    /// Clear the entire collection.
    async fn clear_collection(&self) -> Result<()>;
}
