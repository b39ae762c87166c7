//! Ports: trait boundaries for external collaborators named only by
//! interface — the embedder, the lexical index, the vector store, the graph
//! backend, the parser, and the error sink. Infrastructure code depends only
//! on these traits; `codeindex-providers` supplies concrete implementations.

mod error_sink;
mod graph_driver;
mod hash_cache;
mod vector_store;

pub use error_sink::{ErrorLogEntry, ErrorSink};
pub use graph_driver::{
    AccessMode, GraphDriver, GraphRecord, GraphSession, GraphTransaction, GraphValue, Params,
};
pub use hash_cache::HashCache;
pub use vector_store::VectorStore;

use async_trait::async_trait;

use crate::error::Result;

/// The embedder interface: maps texts to vectors. The output length MUST
/// equal the input length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order and length.
    async fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// The BM25 lexical index interface: accepts documents keyed by an id
/// understood by the caller.
#[async_trait]
pub trait Bm25Index: Send + Sync {
    /// Feed a batch of documents into the index.
    async fn feed_documents(&self, documents: &[(String, String)]) -> Result<()>;

    /// Remove every document belonging to a file path.
    async fn delete_by_file_path(&self, file_path: &str) -> Result<()>;
}

/// The source parser interface: turns one file's raw content into zero or more
/// [`crate::entities::CodeBlock`] records. Out of scope for implementation —
/// a concrete parser (tree-sitter or otherwise) is an external collaborator.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Parse `content` (the file at `file_path`, already known to have content
    /// hash `file_hash`) into its constituent blocks.
    async fn parse_file(
        &self,
        file_path: &str,
        content: &str,
        file_hash: &str,
    ) -> Result<Vec<crate::entities::CodeBlock>>;
}
