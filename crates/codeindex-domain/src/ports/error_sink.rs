//! Error log sink port: append structured error entries to a durable file
//! with bounded-buffer and periodic flush semantics, implemented in
//! `codeindex-infrastructure`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One structured error-log entry (JSON-lines on disk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
    /// The emitting service/component.
    pub service: String,
    /// The file path involved, if any.
    pub file_path: Option<String>,
    /// The operation in progress.
    pub operation: String,
    /// Human-readable error description.
    pub error: String,
    /// Captured stack/backtrace text, if any.
    pub stack: Option<String>,
    /// The block's syntactic kind, if relevant.
    pub block_type: Option<String>,
    /// The block's identifier, if relevant.
    pub block_identifier: Option<String>,
    /// The graph node id, if relevant.
    pub node_id: Option<String>,
    /// Any additional structured context.
    pub additional_context: Option<Value>,
}

/// Required error-sink operations.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Queue an entry for durable logging. May buffer; see implementation for
    /// flush policy.
    async fn log(&self, entry: ErrorLogEntry) -> Result<()>;

    /// Force a flush of any buffered entries.
    async fn flush(&self) -> Result<()>;
}
