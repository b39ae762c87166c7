//! An in-memory vector store fake: points live in a mutex-guarded map keyed
//! by id, good enough to assert on upsert/delete behavior in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use codeindex_domain::error::Result;
use codeindex_domain::ports::VectorStore;
use codeindex_domain::value_objects::VectorPoint;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryVectorStore {
    points: Mutex<HashMap<Uuid, VectorPoint>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn points_for_file(&self, file_path: &str) -> Vec<VectorPoint> {
        self.points
            .lock()
            .await
            .values()
            .filter(|p| p.payload.file_path == file_path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_points(&self, points: Vec<VectorPoint>) -> Result<()> {
        let mut guard = self.points.lock().await;
        for point in points {
            guard.insert(point.id, point);
        }
        Ok(())
    }

    async fn delete_points_by_file_path(&self, file_path: &str) -> Result<()> {
        self.points.lock().await.retain(|_, p| p.payload.file_path != file_path);
        Ok(())
    }

    async fn delete_points_by_multiple_file_paths(&self, file_paths: &[String]) -> Result<()> {
        self.points
            .lock()
            .await
            .retain(|_, p| !file_paths.iter().any(|f| f == &p.payload.file_path));
        Ok(())
    }

    async fn clear_collection(&self) -> Result<()> {
        self.points.lock().await.clear();
        Ok(())
    }
}
