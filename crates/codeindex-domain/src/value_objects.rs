//! Small value types shared across the core: vector points, status snapshots, and
//! the deterministic id scheme.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{CodeBlock, NodeType};

/// Namespace UUID for deriving vector point ids from segment fingerprints.
/// A fixed constant so that two runs over identical content always produce
/// identical point ids.
pub const CODE_BLOCK_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x1e, 0xf3, 0x0a, 0x6b, 0x1e, 0x4b, 0x9a, 0x9b, 0x9a, 0x3f, 0x1e, 0x7a, 0x5c, 0x2d, 0x11,
]);

/// Deterministically derive a vector point id from a segment fingerprint.
///
/// `UUIDv5(segment_hash, CODE_BLOCK_NAMESPACE)`. Pure function of its input: running
/// this twice over identical content always yields the same id.
#[must_use]
pub fn vector_point_id(segment_hash: &str) -> Uuid {
    Uuid::new_v5(&CODE_BLOCK_NAMESPACE, segment_hash.as_bytes())
}

/// Payload stored alongside a vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPointPayload {
    /// Workspace-relative file path.
    pub file_path: String,
    /// Segment source text.
    pub content: String,
    /// 0-based start line.
    pub start_line: u32,
    /// 0-based end line.
    pub end_line: u32,
    /// Symbol identifier.
    pub identifier: String,
    /// Syntactic kind.
    pub node_type: NodeType,
    /// Source language, if known.
    pub language: Option<String>,
    /// Optional enriched metadata (symbol metadata, docs, LSP types).
    pub enriched: Option<serde_json::Value>,
}

/// A point to be upserted into the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    /// Deterministic id, see [`vector_point_id`].
    pub id: Uuid,
    /// The dense embedding.
    pub vector: Vec<f32>,
    /// Associated payload.
    pub payload: VectorPointPayload,
}

impl VectorPoint {
    /// Build a point from a parsed block and its embedding.
    #[must_use]
    pub fn from_block(block: &CodeBlock, vector: Vec<f32>) -> Self {
        Self {
            id: vector_point_id(&block.segment_hash),
            vector,
            payload: VectorPointPayload {
                file_path: block.file_path.clone(),
                content: block.content.clone(),
                start_line: block.start_line,
                end_line: block.end_line,
                identifier: block.identifier.clone(),
                node_type: block.kind,
                language: block.language.clone(),
                enriched: block.symbol_metadata.clone(),
            },
        }
    }
}

/// Per-subsystem status reported by the state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubsystemStatus {
    Idle,
    Indexing,
    Indexed,
    Error,
    Disabled,
    ConnectionFailed,
    ResourceExhausted,
}

impl SubsystemStatus {
    /// Whether this status counts as an error for system-health purposes.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(
            self,
            SubsystemStatus::Error
                | SubsystemStatus::ConnectionFailed
                | SubsystemStatus::ResourceExhausted
        )
    }
}

/// Coarse system-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemStatus {
    Standby,
    Indexing,
    Indexed,
    Error,
}

/// Coarse system-level health, derived from the two subsystem statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Degraded,
    Failed,
}

impl SystemHealth {
    /// Derive overall health from the two subsystem statuses.
    #[must_use]
    pub fn from_statuses(vector: SubsystemStatus, graph: SubsystemStatus) -> Self {
        match (vector.is_error(), graph.is_error()) {
            (false, false) => SystemHealth::Healthy,
            (true, true) => SystemHealth::Failed,
            _ => SystemHealth::Degraded,
        }
    }
}

/// A point-in-time snapshot of indexing progress and health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Vector-side subsystem status.
    pub vector_status: SubsystemStatus,
    /// Graph-side subsystem status.
    pub graph_status: SubsystemStatus,
    /// Derived system-level status.
    pub system_status: SystemStatus,
    /// Derived system-level health.
    pub system_health: SystemHealth,
    /// Items processed so far in the current operation.
    pub processed: u64,
    /// Total items expected in the current operation, if known.
    pub total: Option<u64>,
    /// Human-readable status message.
    pub message: Option<String>,
    /// Consecutive graph failures since the last non-error transition.
    pub graph_consecutive_failures: u32,
}
