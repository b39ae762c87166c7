//! The abstract graph wire interface.
//!
//! Deliberately protocol-agnostic: this models a session-based, query-language
//! backend supporting parameterized statements, read/write sessions, and
//! multi-statement transactions without naming a concrete product. Records
//! expose field access and the ability to distinguish node records (a `labels`
//! field containing `"CodeNode"`); integer values pass through [`GraphValue::Int`],
//! which is always 64-bit regardless of the backend's native width.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Session access mode. Read sessions are pooled; write sessions never are,
/// so a write always observes a fresh connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

/// A dynamically-typed value returned from, or passed as a parameter to, the graph
/// backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Bool(bool),
    /// Always 64-bit, regardless of the backend's native integer width.
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<GraphValue>),
    Map(HashMap<String, GraphValue>),
}

impl GraphValue {
    /// Best-effort extraction as `&str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Best-effort extraction as `i64`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            GraphValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Best-effort extraction as `f64`.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            GraphValue::Float(f) => Some(*f),
            GraphValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// One record returned by a graph query: a field-name-keyed row, with optional
/// node labels when the record represents a node.
#[derive(Debug, Clone, Default)]
pub struct GraphRecord {
    fields: HashMap<String, GraphValue>,
    /// Present when this record is (or carries) a node; used to distinguish node
    /// records from scalar projections per the wire interface contract.
    pub labels: Vec<String>,
}

impl GraphRecord {
    /// Construct a record from its fields.
    #[must_use]
    pub fn new(fields: HashMap<String, GraphValue>) -> Self {
        Self {
            fields,
            labels: Vec::new(),
        }
    }

    /// Attach node labels to this record.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.fields.get(key)
    }

    /// Whether this record represents a `CodeNode`.
    #[must_use]
    pub fn is_code_node(&self) -> bool {
        self.labels.iter().any(|l| l == "CodeNode")
    }
}

/// A single query parameter set: name -> value.
pub type Params = HashMap<String, GraphValue>;

/// An open transaction over a write session.
#[async_trait]
pub trait GraphTransaction: Send {
    /// Run a parameterized statement within this transaction.
    async fn run(&mut self, query: &str, params: Params) -> Result<Vec<GraphRecord>>;

    /// Whether the transaction is still open (neither committed nor rolled back).
    fn is_open(&self) -> bool;

    /// Commit and close the underlying session.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll back and close the underlying session.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// An open session (read or write).
#[async_trait]
pub trait GraphSession: Send {
    /// The mode this session was acquired in.
    fn mode(&self) -> AccessMode;

    /// Run a parameterized statement directly on the session (auto-commit).
    async fn run(&mut self, query: &str, params: Params) -> Result<Vec<GraphRecord>>;

    /// Begin a multi-statement transaction over this (write) session.
    async fn begin_transaction(self: Box<Self>) -> Result<Box<dyn GraphTransaction>>;

    /// Close the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// The driver: creates sessions and owns the connection lifecycle.
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Open a new session in the given access mode.
    async fn session(&self, mode: AccessMode) -> Result<Box<dyn GraphSession>>;

    /// Verify the backend is reachable and credentials are valid.
    async fn verify_connectivity(&self) -> Result<()>;

    /// Close the driver and release all resources.
    async fn close(&self) -> Result<()>;
}
