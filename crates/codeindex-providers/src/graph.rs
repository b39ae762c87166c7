//! An in-memory graph backend fake: nodes and edges live in a shared,
//! mutex-guarded adjacency structure. Good enough to exercise the graph
//! service's query shapes without a real session-based backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use codeindex_domain::error::{Error, Result};
use codeindex_domain::ports::{
    AccessMode, GraphDriver, GraphRecord, GraphSession, GraphTransaction, GraphValue, Params,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct StoredNode {
    fields: HashMap<String, GraphValue>,
}

#[derive(Debug, Clone)]
struct Edge {
    from: String,
    to: String,
    rel_type: String,
    metadata: HashMap<String, GraphValue>,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<String, StoredNode>,
    edges: Vec<Edge>,
}

/// Shared in-memory graph state plus a connectivity flag a test can flip to
/// simulate an outage.
#[derive(Clone)]
pub struct InMemoryGraphDriver {
    state: Arc<Mutex<GraphState>>,
    healthy: Arc<std::sync::atomic::AtomicBool>,
}

impl Default for InMemoryGraphDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GraphState::default())),
            healthy: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }

    /// Simulate an outage: subsequent sessions/health checks fail until this
    /// is flipped back.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, std::sync::atomic::Ordering::SeqCst);
    }

    /// Current node count, for assertions.
    pub async fn node_count(&self) -> usize {
        self.state.lock().await.nodes.len()
    }

    /// The metadata stored on the first matching edge, for assertions.
    pub async fn edge_metadata(&self, from: &str, to: &str, rel_type: &str) -> Option<HashMap<String, GraphValue>> {
        self.state
            .lock()
            .await
            .edges
            .iter()
            .find(|e| e.from == from && e.to == to && e.rel_type == rel_type)
            .map(|e| e.metadata.clone())
    }
}

#[async_trait]
impl GraphDriver for InMemoryGraphDriver {
    async fn session(&self, mode: AccessMode) -> Result<Box<dyn GraphSession>> {
        if !self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::connection("simulated outage"));
        }
        Ok(Box::new(InMemoryGraphSession {
            state: Arc::clone(&self.state),
            mode,
        }))
    }

    async fn verify_connectivity(&self) -> Result<()> {
        if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::connection("simulated outage"))
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct InMemoryGraphSession {
    state: Arc<Mutex<GraphState>>,
    mode: AccessMode,
}

fn param_str(params: &Params, key: &str) -> Option<String> {
    params.get(key).and_then(GraphValue::as_str).map(str::to_owned)
}

async fn execute(state: &Mutex<GraphState>, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
    let mut guard = state.lock().await;

    if query.starts_with("MERGE (n:CodeNode") {
        let id = param_str(&params, "id").unwrap_or_default();
        let mut fields = params.clone();
        fields.insert("id".into(), GraphValue::Str(id.clone()));
        guard.nodes.insert(id, StoredNode { fields });
        return Ok(Vec::new());
    }

    if query.contains("MERGE (a)-[r:") {
        let from = param_str(&params, "from_id").unwrap_or_default();
        let to = param_str(&params, "to_id").unwrap_or_default();
        let rel_type = query
            .split("MERGE (a)-[r:")
            .nth(1)
            .and_then(|rest| rest.split(']').next())
            .unwrap_or("")
            .to_owned();
        let metadata = match params.get("metadata") {
            Some(GraphValue::Map(map)) => map.clone(),
            _ => HashMap::new(),
        };
        guard.edges.push(Edge { from, to, rel_type, metadata });
        return Ok(Vec::new());
    }

    if query.contains("DETACH DELETE n") && query.contains("{id: $id}") {
        let id = param_str(&params, "id").unwrap_or_default();
        guard.nodes.remove(&id);
        guard.edges.retain(|e| e.from != id && e.to != id);
        return Ok(Vec::new());
    }

    if query.contains("DETACH DELETE n") && query.contains("{file_path: $file_path}") {
        let file_path = param_str(&params, "file_path").unwrap_or_default();
        let removed: Vec<String> = guard
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.fields
                    .get("file_path")
                    .and_then(GraphValue::as_str)
                    .map(|p| p == file_path)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            guard.nodes.remove(id);
        }
        guard.edges.retain(|e| !removed.contains(&e.from) && !removed.contains(&e.to));
        return Ok(Vec::new());
    }

    if query.contains("MATCH (n:CodeNode) WITH n LIMIT") {
        let count = guard.nodes.len() as i64;
        guard.nodes.clear();
        guard.edges.clear();
        let mut fields = HashMap::new();
        fields.insert("deleted".to_owned(), GraphValue::Int(count));
        return Ok(vec![GraphRecord::new(fields)]);
    }

    if query == "MATCH (n:CodeNode {id: $id}) RETURN n" {
        let id = param_str(&params, "id").unwrap_or_default();
        if let Some(node) = guard.nodes.get(&id) {
            let mut fields = HashMap::new();
            fields.insert("n".to_owned(), GraphValue::Map(node.fields.clone()));
            return Ok(vec![GraphRecord::new(fields).with_labels(vec!["CodeNode".to_owned()])]);
        }
        return Ok(Vec::new());
    }
    if query.starts_with("MATCH (test:CodeNode)-[:TESTS]->") {
        let id = param_str(&params, "id").unwrap_or_default();
        return Ok(related(&guard, &id, "TESTS", Direction::Incoming, "test"));
    }
    if query.starts_with("MATCH (caller:CodeNode)-[:CALLS]->") {
        let id = param_str(&params, "id").unwrap_or_default();
        return Ok(related(&guard, &id, "CALLS", Direction::Incoming, "caller"));
    }
    if query.starts_with("MATCH (n:CodeNode {id: $id})-[:CALLS]->") {
        let id = param_str(&params, "id").unwrap_or_default();
        return Ok(related(&guard, &id, "CALLS", Direction::Outgoing, "callee"));
    }
    if query.contains("RETURN DISTINCT dep") && query.contains("]->(dep:CodeNode)") {
        let id = param_str(&params, "id").unwrap_or_default();
        let types = extract_types(query);
        return Ok(related_multi(&guard, &id, &types, Direction::Outgoing, "dep"));
    }
    if query.contains("RETURN DISTINCT dep") && query.contains(")-[:") && query.contains("(n:CodeNode {id: $id})") && query.starts_with("MATCH (dep:CodeNode)") {
        let id = param_str(&params, "id").unwrap_or_default();
        let types = extract_types(query);
        return Ok(related_multi(&guard, &id, &types, Direction::Incoming, "dep"));
    }
    if query.starts_with("MATCH (impl:CodeNode)-[:IMPLEMENTS]->") {
        let id = param_str(&params, "id").unwrap_or_default();
        return Ok(related(&guard, &id, "IMPLEMENTS", Direction::Incoming, "impl"));
    }
    if query.starts_with("MATCH (sub:CodeNode)-[:EXTENDS]->") {
        let id = param_str(&params, "id").unwrap_or_default();
        return Ok(related(&guard, &id, "EXTENDS", Direction::Incoming, "sub"));
    }
    if query.contains("RETURN DISTINCT impacted") {
        let id = param_str(&params, "id").unwrap_or_default();
        let types = extract_types(query);
        return Ok(related_multi(&guard, &id, &types, Direction::Incoming, "impacted"));
    }

    Ok(Vec::new())
}

enum Direction {
    Incoming,
    Outgoing,
}

fn extract_types(query: &str) -> Vec<String> {
    query
        .split("[:")
        .nth(1)
        .and_then(|rest| rest.split(|c| c == ']' || c == '*').next())
        .map(|types| types.split('|').map(str::to_owned).collect())
        .unwrap_or_default()
}

fn related(state: &GraphState, id: &str, rel_type: &str, direction: Direction, field: &str) -> Vec<GraphRecord> {
    related_multi(state, id, &[rel_type.to_owned()], direction, field)
}

fn related_multi(
    state: &GraphState,
    id: &str,
    rel_types: &[String],
    direction: Direction,
    field: &str,
) -> Vec<GraphRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for edge in &state.edges {
        if !rel_types.iter().any(|t| t == &edge.rel_type) {
            continue;
        }
        let other = match direction {
            Direction::Outgoing if edge.from == id => Some(&edge.to),
            Direction::Incoming if edge.to == id => Some(&edge.from),
            _ => None,
        };
        let Some(other_id) = other else { continue };
        if !seen.insert(other_id.clone()) {
            continue;
        }
        if let Some(node) = state.nodes.get(other_id) {
            let mut fields = HashMap::new();
            fields.insert(field.to_owned(), GraphValue::Map(node.fields.clone()));
            out.push(GraphRecord::new(fields).with_labels(vec!["CodeNode".to_owned()]));
        }
    }
    out
}

#[async_trait]
impl GraphSession for InMemoryGraphSession {
    fn mode(&self) -> AccessMode {
        self.mode
    }

    async fn run(&mut self, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
        execute(&self.state, query, params).await
    }

    async fn begin_transaction(self: Box<Self>) -> Result<Box<dyn GraphTransaction>> {
        Ok(Box::new(InMemoryGraphTransaction {
            state: self.state,
            open: true,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct InMemoryGraphTransaction {
    state: Arc<Mutex<GraphState>>,
    open: bool,
}

#[async_trait]
impl GraphTransaction for InMemoryGraphTransaction {
    async fn run(&mut self, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
        if !self.open {
            return Err(Error::TransactionClosed);
        }
        execute(&self.state, query, params).await
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.open = false;
        Ok(())
    }
}
