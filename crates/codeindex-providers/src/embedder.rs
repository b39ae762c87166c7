//! A deterministic embedder fake: hashes each text into a fixed-dimension
//! vector so that identical inputs always produce identical embeddings,
//! without pulling in a real model.

use async_trait::async_trait;
use codeindex_domain::error::Result;
use codeindex_domain::ports::Embedder;

const DIMENSIONS: usize = 16;

pub struct DeterministicEmbedder {
    dimensions: usize,
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self { dimensions: DIMENSIONS }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimensions;
            vector[slot] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
