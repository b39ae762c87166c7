//! Core data model shared by the scanner, graph service, and vector pipeline.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Syntactic kind of a parsed code segment / graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Function,
    Class,
    Method,
    Interface,
    Variable,
    Import,
    File,
}

impl NodeType {
    /// Stable lowercase string used in logs and in Cypher-ish literals.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Function => "function",
            NodeType::Class => "class",
            NodeType::Method => "method",
            NodeType::Interface => "interface",
            NodeType::Variable => "variable",
            NodeType::Import => "import",
            NodeType::File => "file",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed allowlist of relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    Calls,
    CalledBy,
    Tests,
    TestedBy,
    HasType,
    AcceptsType,
    ReturnsType,
    Imports,
    Extends,
    ExtendedBy,
    Implements,
    ImplementedBy,
    Contains,
    Defines,
    Uses,
}

impl RelationshipType {
    /// All allowlisted variants, in declaration order.
    pub const ALL: [RelationshipType; 15] = [
        RelationshipType::Calls,
        RelationshipType::CalledBy,
        RelationshipType::Tests,
        RelationshipType::TestedBy,
        RelationshipType::HasType,
        RelationshipType::AcceptsType,
        RelationshipType::ReturnsType,
        RelationshipType::Imports,
        RelationshipType::Extends,
        RelationshipType::ExtendedBy,
        RelationshipType::Implements,
        RelationshipType::ImplementedBy,
        RelationshipType::Contains,
        RelationshipType::Defines,
        RelationshipType::Uses,
    ];

    /// SCREAMING_SNAKE_CASE form, as it appears embedded in Cypher-style queries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::Calls => "CALLS",
            RelationshipType::CalledBy => "CALLED_BY",
            RelationshipType::Tests => "TESTS",
            RelationshipType::TestedBy => "TESTED_BY",
            RelationshipType::HasType => "HAS_TYPE",
            RelationshipType::AcceptsType => "ACCEPTS_TYPE",
            RelationshipType::ReturnsType => "RETURNS_TYPE",
            RelationshipType::Imports => "IMPORTS",
            RelationshipType::Extends => "EXTENDS",
            RelationshipType::ExtendedBy => "EXTENDED_BY",
            RelationshipType::Implements => "IMPLEMENTS",
            RelationshipType::ImplementedBy => "IMPLEMENTED_BY",
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::Defines => "DEFINES",
            RelationshipType::Uses => "USES",
        }
    }

    /// Parse from the SCREAMING_SNAKE_CASE wire form; `None` if not allowlisted.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    /// The edges considered for "impacted by" traversals (blast radius, impact).
    #[must_use]
    pub fn impact_edge_types() -> [RelationshipType; 3] {
        [
            RelationshipType::CalledBy,
            RelationshipType::ExtendedBy,
            RelationshipType::ImplementedBy,
        ]
    }

    /// The edges considered for "depends on" traversals (dependency tree).
    #[must_use]
    pub fn dependency_edge_types() -> [RelationshipType; 7] {
        [
            RelationshipType::Calls,
            RelationshipType::Extends,
            RelationshipType::Implements,
            RelationshipType::HasType,
            RelationshipType::AcceptsType,
            RelationshipType::ReturnsType,
            RelationshipType::Imports,
        ]
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parser-produced, addressable span of source (scanner input, out of scope for
/// implementation — the parser itself is an external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Stable fingerprint of this segment's content, used to derive the vector id.
    pub segment_hash: String,
    /// Workspace-relative path of the source file.
    pub file_path: String,
    /// The segment's source text.
    pub content: String,
    /// 0-based start line (inclusive).
    pub start_line: u32,
    /// 0-based end line (inclusive).
    pub end_line: u32,
    /// Content hash of the whole file this block was extracted from.
    pub file_hash: String,
    /// The symbol this block identifies (function name, class name, ...).
    pub identifier: String,
    /// Syntactic kind.
    pub kind: NodeType,
    /// Source language, if known.
    pub language: Option<String>,
    /// Free-form symbol metadata (signatures, modifiers, ...).
    pub symbol_metadata: Option<serde_json::Value>,
    /// Associated documentation / docstring.
    pub documentation: Option<String>,
    /// LSP-derived type information, if available.
    pub lsp_type_info: Option<serde_json::Value>,
    /// Imported symbols, for import-kind blocks.
    pub imports: Vec<String>,
    /// Exported symbols, for file/module-kind blocks.
    pub exports: Vec<String>,
}

/// A graph vertex. `id` is the sole identity; upsert replaces every other field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeNode {
    /// Unique, non-empty identifier.
    pub id: String,
    /// Syntactic kind.
    pub node_type: NodeType,
    /// Non-empty display name.
    pub name: String,
    /// Non-empty, normalized file path.
    pub file_path: String,
    /// Non-negative start line; `start_line <= end_line`.
    pub start_line: u32,
    /// Non-negative end line.
    pub end_line: u32,
    /// Source language, if known.
    pub language: Option<String>,
}

impl CodeNode {
    /// Structural validity check independent of the graph service's validator
    /// (which also tracks failure counters) — kept here so the entity itself can
    /// never be constructed in an observably inconsistent shape by honest callers.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty() && !self.file_path.is_empty()
            && self.start_line <= self.end_line
    }
}

/// Typed metadata carried by a [`CodeRelationship`], keyed by its
/// [`RelationshipType`]. Unrecognized/free-form metadata is preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// IMPORTS: originating module/path.
    pub source: Option<String>,
    /// IMPORTS: imported symbol names.
    pub symbols: Option<Vec<String>>,
    /// IMPORTS: whether this is a default import.
    pub is_default: Option<bool>,
    /// CALLS: call expression kind (e.g. "direct", "method").
    pub call_type: Option<String>,
    /// CALLS / structural: source line (0-based).
    pub line: Option<i64>,
    /// CALLS: source column (0-based).
    pub column: Option<i64>,
    /// TESTS: confidence in [0, 1] that this is a test-of relationship.
    pub confidence: Option<f64>,
    /// TESTS: how the relationship was detected (naming convention, annotation, ...).
    pub detection_method: Option<String>,
    /// TESTS: test framework, if known.
    pub test_framework: Option<String>,
    /// HAS_TYPE/ACCEPTS_TYPE/RETURNS_TYPE: the type expression as written.
    pub type_string: Option<String>,
    /// HAS_TYPE/ACCEPTS_TYPE/RETURNS_TYPE: whether the type was inferred.
    pub is_inferred: Option<bool>,
    /// HAS_TYPE/ACCEPTS_TYPE/RETURNS_TYPE: provenance of the type info.
    pub type_source: Option<String>,
    /// EXTENDS: parent class name.
    pub parent_class: Option<String>,
    /// EXTENDS: whether the parent is abstract.
    pub is_abstract: Option<bool>,
    /// IMPLEMENTS: interface name.
    pub interface: Option<String>,
    /// Any remaining sanitized key/value pairs not covered above.
    pub extra: HashMap<String, serde_json::Value>,
}

/// A graph edge between two nodes, identified by their ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRelationship {
    /// Non-empty source node id.
    pub from_id: String,
    /// Non-empty target node id.
    pub to_id: String,
    /// Allowlisted relationship type.
    pub rel_type: RelationshipType,
    /// Sanitized, typed metadata.
    pub metadata: RelationshipMetadata,
}
