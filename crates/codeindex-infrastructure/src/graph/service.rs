//! The Graph Service: the single entry point the rest of the system uses to
//! talk to the graph backend. Wires together the connection pool, the retry
//! policy, the circuit breaker, the health monitor, structural validation, and
//! the blast-radius cache.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codeindex_domain::constants::{
    CLEAR_ALL_PAGE_SIZE, DEFAULT_QUERY_TIMEOUT_MS, DEFAULT_SLOW_QUERY_THRESHOLD_MS, MAX_MAX_DEPTH,
    MIN_MAX_DEPTH, SHUTDOWN_DRAIN_TIMEOUT_MS,
};
use codeindex_domain::entities::{CodeNode, CodeRelationship, RelationshipType};
use codeindex_domain::error::{Error, Result};
use codeindex_domain::ports::{GraphDriver, GraphRecord, GraphValue, Params};
use serde_json::Value;
use tracing::{info, warn};

use crate::sanitizer::{sanitize, SanitizerLimits};

use super::blast_radius::{BlastRadiusCache, BlastRadiusCacheConfig};
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::health::{HealthMonitor, HealthMonitorConfig};
use super::pool::{PoolConfig, PoolMetrics, SessionPool};
use super::retry::{execute_with_retry, RetryMetrics, RetryPolicy};
use super::risk::{assess_change_safety, ChangeSafetyAssessment, ImpactCounts};
use super::validation::{validate_node, validate_relationship, ValidationFailureCounters};

/// Assembled configuration for a [`GraphService`].
#[derive(Debug, Clone)]
pub struct GraphServiceConfig {
    pub pool: PoolConfig,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    pub health: HealthMonitorConfig,
    pub blast_radius_cache: BlastRadiusCacheConfig,
    pub metadata_limits: SanitizerLimits,
    pub query_timeout: Duration,
    pub slow_query_threshold: Duration,
}

impl Default for GraphServiceConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            health: HealthMonitorConfig::default(),
            blast_radius_cache: BlastRadiusCacheConfig::default(),
            metadata_limits: SanitizerLimits::default(),
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            slow_query_threshold: Duration::from_millis(DEFAULT_SLOW_QUERY_THRESHOLD_MS),
        }
    }
}

/// A point-in-time snapshot of the service's operational counters.
#[derive(Debug, Clone, Default)]
pub struct GraphServiceMetrics {
    pub pool: PoolMetricsSnapshot,
    pub total_errors: u64,
    pub connection_errors: u64,
    pub deadlock_count: u64,
    pub retries_attempted: u64,
    pub slow_queries: u64,
    pub validation_failures: ValidationFailureCounters,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolMetricsSnapshot {
    pub created: u64,
    pub closed: u64,
    pub acquisitions: u64,
    pub acquisition_failures: u64,
}

impl From<PoolMetrics> for PoolMetricsSnapshot {
    fn from(m: PoolMetrics) -> Self {
        Self {
            created: m.created,
            closed: m.closed,
            acquisitions: m.acquisitions,
            acquisition_failures: m.acquisition_failures,
        }
    }
}

fn str_value(s: impl Into<String>) -> GraphValue {
    GraphValue::Str(s.into())
}

fn int_value(i: impl Into<i64>) -> GraphValue {
    GraphValue::Int(i.into())
}

/// Convert sanitized metadata into the wire-level value type, recursively.
/// Sanitization already flattened depth/size/array bounds, so this is a pure
/// shape translation with no further limit enforcement.
fn json_to_graph_value(value: &Value) -> GraphValue {
    match value {
        Value::Null => GraphValue::Null,
        Value::Bool(b) => GraphValue::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map(GraphValue::Int)
            .unwrap_or_else(|| GraphValue::Float(n.as_f64().unwrap_or(0.0))),
        Value::String(s) => GraphValue::Str(s.clone()),
        Value::Array(items) => GraphValue::List(items.iter().map(json_to_graph_value).collect()),
        Value::Object(map) => GraphValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_graph_value(v)))
                .collect(),
        ),
    }
}

/// Reject queries that look like they try to smuggle unsanitized input: a
/// stacked statement (more than one top-level `;`-terminated clause) or a
/// literal-looking destructive keyword not going through the parameterized
/// path (a best-effort heuristic, not a full parser — parameterization is the
/// real defense, this only catches obviously hand-built strings).
fn looks_unsafe(query: &str) -> Option<&'static str> {
    let trimmed = query.trim();
    let semicolon_count = trimmed.trim_end_matches(';').matches(';').count();
    if semicolon_count > 0 {
        return Some("multiple statements in a single query are not allowed");
    }
    let upper = trimmed.to_ascii_uppercase();
    if upper.contains("DROP ") || upper.contains("DROP DATABASE") {
        return Some("DROP is not allowed through executeQuery");
    }
    None
}

/// The graph service.
pub struct GraphService {
    pool: SessionPool,
    breaker: Arc<CircuitBreaker>,
    health: Option<Arc<HealthMonitor>>,
    blast_radius_cache: BlastRadiusCache,
    config: GraphServiceConfig,
    retry_metrics: tokio::sync::Mutex<RetryMetrics>,
    validation_failures: std::sync::Mutex<ValidationFailureCounters>,
    slow_queries: AtomicU64,
    closed: AtomicBool,
    health_handle: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
    active_operations: Arc<AtomicU64>,
}

impl GraphService {
    /// Construct a service over `driver`, starting its background health
    /// monitor.
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>, config: GraphServiceConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker));
        let health = Arc::new(HealthMonitor::new(
            Arc::clone(&driver),
            Arc::clone(&breaker),
            config.health,
        ));
        let health_handle = health.spawn();
        Self {
            pool: SessionPool::new(driver, config.pool),
            breaker,
            health: Some(health),
            blast_radius_cache: BlastRadiusCache::new(config.blast_radius_cache),
            config,
            retry_metrics: tokio::sync::Mutex::new(RetryMetrics::default()),
            validation_failures: std::sync::Mutex::new(ValidationFailureCounters::default()),
            slow_queries: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            health_handle: std::sync::Mutex::new(Some(health_handle)),
            active_operations: Arc::new(AtomicU64::new(0)),
        }
    }

    fn guard(&self) -> Result<OperationGuard> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::external("graph-service", "service is closed"));
        }
        self.active_operations.fetch_add(1, Ordering::SeqCst);
        Ok(OperationGuard {
            counter: Arc::clone(&self.active_operations),
        })
    }

    async fn run_write(&self, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
        let _guard = self.guard()?;
        if !self.is_connected() {
            warn!("graph backend reports disconnected; dropping write silently");
            return Ok(Vec::new());
        }
        let query_owned = query.to_owned();
        let started = std::time::Instant::now();
        let mut metrics = self.retry_metrics.lock().await;
        let result = execute_with_retry(&self.config.retry, &self.breaker, &mut metrics, false, || {
            let query = query_owned.clone();
            let params = params.clone();
            async move {
                let mut session = self.pool.acquire_write().await?;
                let result = tokio::time::timeout(self.config.query_timeout, session.run(&query, params)).await;
                session.close().await.ok();
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(Error::Timeout {
                        operation: "graph_write".to_owned(),
                        timeout_ms: self.config.query_timeout.as_millis() as u64,
                    }),
                }
            }
        })
        .await;
        self.record_slow(started);
        self.blast_radius_cache.invalidate_all();
        result
    }

    async fn run_read(&self, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
        let _guard = self.guard()?;
        if !self.is_connected() {
            warn!("graph backend reports disconnected; returning empty read result");
            return Ok(Vec::new());
        }
        let query_owned = query.to_owned();
        let started = std::time::Instant::now();
        let mut metrics = self.retry_metrics.lock().await;
        let result = execute_with_retry(&self.config.retry, &self.breaker, &mut metrics, false, || {
            let query = query_owned.clone();
            let params = params.clone();
            async move {
                let mut session = self.pool.acquire_read().await?;
                let result = tokio::time::timeout(self.config.query_timeout, session.run(&query, params)).await;
                session.release().await;
                result.map_err(|_| Error::Timeout {
                    operation: "graph_read".to_owned(),
                    timeout_ms: self.config.query_timeout.as_millis() as u64,
                })?
            }
        })
        .await;
        self.record_slow(started);
        result
    }

    fn record_slow(&self, started: std::time::Instant) {
        if started.elapsed() >= self.config.slow_query_threshold {
            self.slow_queries.fetch_add(1, Ordering::SeqCst);
            warn!(elapsed_ms = started.elapsed().as_millis() as u64, "slow graph query");
        }
    }

    // ---- write API ----------------------------------------------------

    /// Upsert a single node by id, replacing every other field.
    pub async fn upsert_node(&self, node: &CodeNode) -> Result<()> {
        let findings = validate_node(node);
        self.validation_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record_node(&findings);
        if !findings.is_empty() {
            return Err(Error::Validation {
                field: findings[0].field.clone(),
                message: findings[0].message.clone(),
            });
        }
        let mut params = Params::new();
        params.insert("id".into(), str_value(node.id.clone()));
        params.insert("node_type".into(), str_value(node.node_type.as_str()));
        params.insert("name".into(), str_value(node.name.clone()));
        params.insert("file_path".into(), str_value(node.file_path.clone()));
        params.insert("start_line".into(), int_value(node.start_line as i64));
        params.insert("end_line".into(), int_value(node.end_line as i64));
        params.insert(
            "language".into(),
            node.language.clone().map(str_value).unwrap_or(GraphValue::Null),
        );
        self.run_write(
            "MERGE (n:CodeNode {id: $id}) SET n += {node_type: $node_type, name: $name, \
             file_path: $file_path, start_line: $start_line, end_line: $end_line, language: $language}",
            params,
        )
        .await?;
        Ok(())
    }

    /// Upsert many nodes. Each is validated independently; the first failure
    /// aborts the remaining batch (callers that want partial application
    /// should pre-filter with [`validate_node`]).
    pub async fn upsert_nodes(&self, nodes: &[CodeNode]) -> Result<()> {
        for node in nodes {
            self.upsert_node(node).await?;
        }
        Ok(())
    }

    /// Create a relationship between two existing nodes. The relationship's
    /// metadata is sanitized before it reaches the backend, and the sanitized
    /// map is written onto the edge itself.
    pub async fn create_relationship(&self, relationship: &CodeRelationship) -> Result<()> {
        let findings = validate_relationship(relationship);
        self.validation_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record_relationship(&findings);
        if !findings.is_empty() {
            return Err(Error::Validation {
                field: findings[0].field.clone(),
                message: findings[0].message.clone(),
            });
        }

        let metadata_json = serde_json::to_value(&relationship.metadata).unwrap_or(Value::Null);
        let sanitized = match sanitize(&metadata_json, &self.config.metadata_limits) {
            Ok(sanitized) => sanitized,
            Err(e) => {
                self.validation_failures
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .record_metadata_failure();
                return Err(e);
            }
        };

        let mut params = Params::new();
        params.insert("from_id".into(), str_value(relationship.from_id.clone()));
        params.insert("to_id".into(), str_value(relationship.to_id.clone()));
        params.insert(
            "metadata".into(),
            json_to_graph_value(&Value::Object(sanitized.value)),
        );
        let query = format!(
            "MATCH (a:CodeNode {{id: $from_id}}), (b:CodeNode {{id: $to_id}}) \
             MERGE (a)-[r:{}]->(b) SET r += $metadata",
            relationship.rel_type.as_str()
        );
        self.run_write(&query, params).await?;
        Ok(())
    }

    /// Create many relationships in sequence.
    pub async fn create_relationships(&self, relationships: &[CodeRelationship]) -> Result<()> {
        for relationship in relationships {
            self.create_relationship(relationship).await?;
        }
        Ok(())
    }

    /// Delete a node (and its incident relationships) by id.
    pub async fn delete_node(&self, id: &str) -> Result<()> {
        let mut params = Params::new();
        params.insert("id".into(), str_value(id));
        self.run_write("MATCH (n:CodeNode {id: $id}) DETACH DELETE n", params)
            .await?;
        Ok(())
    }

    /// Delete every node belonging to `file_path`.
    pub async fn delete_nodes_by_file_path(&self, file_path: &str) -> Result<()> {
        let mut params = Params::new();
        params.insert("file_path".into(), str_value(file_path));
        self.run_write(
            "MATCH (n:CodeNode {file_path: $file_path}) DETACH DELETE n",
            params,
        )
        .await?;
        Ok(())
    }

    /// Delete every node belonging to any of `file_paths`.
    pub async fn delete_nodes_by_multiple_file_paths(&self, file_paths: &[String]) -> Result<()> {
        for path in file_paths {
            self.delete_nodes_by_file_path(path).await?;
        }
        Ok(())
    }

    /// Delete every `CodeNode` in the graph, paginated to bound transaction
    /// size.
    pub async fn clear_all(&self) -> Result<()> {
        loop {
            let mut params = Params::new();
            params.insert("limit".into(), int_value(CLEAR_ALL_PAGE_SIZE as i64));
            let records = self
                .run_write(
                    "MATCH (n:CodeNode) WITH n LIMIT $limit DETACH DELETE n RETURN count(n) AS deleted",
                    params,
                )
                .await?;
            let deleted = records
                .first()
                .and_then(|r| r.get("deleted"))
                .and_then(GraphValue::as_int)
                .unwrap_or(0);
            if deleted == 0 {
                break;
            }
        }
        Ok(())
    }

    // ---- read API -------------------------------------------------------

    async fn find_related(&self, id: &str, direction_query: &str) -> Result<Vec<GraphRecord>> {
        let mut params = Params::new();
        params.insert("id".into(), str_value(id));
        self.run_read(direction_query, params).await
    }

    /// Nodes with an incoming `CALLS` edge to `id`.
    pub async fn find_callers(&self, id: &str) -> Result<Vec<GraphRecord>> {
        self.find_related(
            id,
            "MATCH (caller:CodeNode)-[:CALLS]->(n:CodeNode {id: $id}) RETURN caller",
        )
        .await
    }

    /// Nodes reachable from `id` via an outgoing `CALLS` edge.
    pub async fn find_callees(&self, id: &str) -> Result<Vec<GraphRecord>> {
        self.find_related(
            id,
            "MATCH (n:CodeNode {id: $id})-[:CALLS]->(callee:CodeNode) RETURN callee",
        )
        .await
    }

    /// Nodes `id` depends on (calls, extends, implements, imports, ...).
    pub async fn find_dependencies(&self, id: &str) -> Result<Vec<GraphRecord>> {
        let types: Vec<&str> = RelationshipType::dependency_edge_types()
            .iter()
            .map(|t| t.as_str())
            .collect();
        let query = format!(
            "MATCH (n:CodeNode {{id: $id}})-[:{}]->(dep:CodeNode) RETURN DISTINCT dep",
            types.join("|")
        );
        self.find_related(id, &query).await
    }

    /// Nodes that depend on `id`.
    pub async fn find_dependents(&self, id: &str) -> Result<Vec<GraphRecord>> {
        let types: Vec<&str> = RelationshipType::dependency_edge_types()
            .iter()
            .map(|t| t.as_str())
            .collect();
        let query = format!(
            "MATCH (dep:CodeNode)-[:{}]->(n:CodeNode {{id: $id}}) RETURN DISTINCT dep",
            types.join("|")
        );
        self.find_related(id, &query).await
    }

    /// Nodes implementing `id` (an interface).
    pub async fn find_implementations(&self, id: &str) -> Result<Vec<GraphRecord>> {
        self.find_related(
            id,
            "MATCH (impl:CodeNode)-[:IMPLEMENTS]->(n:CodeNode {id: $id}) RETURN impl",
        )
        .await
    }

    /// Nodes subclassing `id` (a class).
    pub async fn find_subclasses(&self, id: &str) -> Result<Vec<GraphRecord>> {
        self.find_related(
            id,
            "MATCH (sub:CodeNode)-[:EXTENDS]->(n:CodeNode {id: $id}) RETURN sub",
        )
        .await
    }

    /// Nodes transitively impacted by changing `id`, up to `max_depth` hops
    /// along impact edges (`CALLED_BY`, `EXTENDED_BY`, `IMPLEMENTED_BY`),
    /// clamped to the documented depth bounds.
    pub async fn find_impacted_nodes(&self, id: &str, max_depth: u32) -> Result<Vec<GraphRecord>> {
        let depth = max_depth.clamp(MIN_MAX_DEPTH, MAX_MAX_DEPTH);
        let types: Vec<&str> = RelationshipType::impact_edge_types()
            .iter()
            .map(|t| t.as_str())
            .collect();
        let query = format!(
            "MATCH (n:CodeNode {{id: $id}})<-[:{}*1..{}]-(impacted:CodeNode) RETURN DISTINCT impacted",
            types.join("|"),
            depth
        );
        self.find_related(id, &query).await
    }

    /// The transitive dependency tree of `id`, up to `max_depth` hops along
    /// dependency edges.
    pub async fn find_dependency_tree(&self, id: &str, max_depth: u32) -> Result<Vec<GraphRecord>> {
        let depth = max_depth.clamp(MIN_MAX_DEPTH, MAX_MAX_DEPTH);
        let types: Vec<&str> = RelationshipType::dependency_edge_types()
            .iter()
            .map(|t| t.as_str())
            .collect();
        let query = format!(
            "MATCH (n:CodeNode {{id: $id}})-[:{}*1..{}]->(dep:CodeNode) RETURN DISTINCT dep",
            types.join("|"),
            depth
        );
        self.find_related(id, &query).await
    }

    /// Fetch the target node itself, to confirm it actually exists before a
    /// blast-radius assessment is trusted.
    async fn find_target_node(&self, id: &str) -> Result<Vec<GraphRecord>> {
        let mut params = Params::new();
        params.insert("id".into(), str_value(id));
        self.run_read("MATCH (n:CodeNode {id: $id}) RETURN n", params).await
    }

    /// Tests covering `id`, via an incoming `TESTS` edge.
    async fn find_test_coverage(&self, id: &str) -> Result<Vec<GraphRecord>> {
        self.find_related(
            id,
            "MATCH (test:CodeNode)-[:TESTS]->(n:CodeNode {id: $id}) RETURN test",
        )
        .await
    }

    fn counts_from_records(records: &[GraphRecord], file_field: &str) -> ImpactCounts {
        let impacted_nodes = records.len() as u32;
        let mut files = std::collections::HashSet::new();
        let mut test_count = 0u32;
        for record in records {
            if let Some(node) = record.get(file_field) {
                if let GraphValue::Map(map) = node {
                    if let Some(GraphValue::Str(path)) = map.get("file_path") {
                        files.insert(path.clone());
                    }
                    if let Some(GraphValue::Str(node_type)) = map.get("node_type") {
                        if node_type.contains("test") {
                            test_count += 1;
                        }
                    }
                }
            }
        }
        ImpactCounts {
            impacted_nodes,
            impacted_files: files.len() as u32,
            max_depth: 0,
            test_count,
            ..Default::default()
        }
    }

    /// Compute (and cache) the blast-radius assessment for `id` at `max_depth`.
    /// On a cache miss this runs the impact, dependency-tree, target-node-fetch,
    /// and test-coverage queries concurrently and folds all four into the
    /// resulting metrics.
    pub async fn calculate_blast_radius(&self, id: &str, max_depth: u32) -> Result<ChangeSafetyAssessment> {
        let depth = max_depth.clamp(MIN_MAX_DEPTH, MAX_MAX_DEPTH);
        if let Some(cached) = self.blast_radius_cache.get(id, depth) {
            return Ok(cached);
        }

        let (impacted, dependency_tree, target, test_coverage) = tokio::join!(
            self.find_impacted_nodes(id, depth),
            self.find_dependency_tree(id, depth),
            self.find_target_node(id),
            self.find_test_coverage(id),
        );
        let impacted = impacted?;
        let dependency_tree = dependency_tree?;
        let target = target?;
        let test_coverage = test_coverage?;

        let mut counts = Self::counts_from_records(&impacted, "impacted");
        counts.max_depth = depth;
        counts.dependency_count = dependency_tree.len() as u32;
        counts.target_found = !target.is_empty();
        if !test_coverage.is_empty() {
            counts.test_count = test_coverage.len() as u32;
        }

        let assessment = assess_change_safety(counts);
        self.blast_radius_cache.insert(id, depth, assessment.clone());
        Ok(assessment)
    }

    /// Derive a change-safety verdict for `id`: identical computation to
    /// [`Self::calculate_blast_radius`] (same cache, same four queries), kept
    /// as its own entry point for callers that think in terms of "is this
    /// change safe" rather than "what's the blast radius".
    pub async fn assess_change_safety(&self, id: &str, max_depth: u32) -> Result<ChangeSafetyAssessment> {
        self.calculate_blast_radius(id, max_depth).await
    }

    /// Execute an arbitrary parameterized read query, refusing anything that
    /// looks like it tries to smuggle multiple statements or an unparameterized
    /// destructive keyword.
    pub async fn execute_query(&self, query: &str, params: Params) -> Result<Vec<GraphRecord>> {
        if let Some(reason) = looks_unsafe(query) {
            return Err(Error::UnsafeQuery {
                message: reason.to_owned(),
            });
        }
        self.run_read(query, params).await
    }

    // ---- transactions -----------------------------------------------------

    /// Begin a multi-statement write transaction.
    pub async fn begin_transaction(&self) -> Result<Box<dyn codeindex_domain::ports::GraphTransaction>> {
        let _guard = self.guard()?;
        let session = self.pool.acquire_write().await?;
        session.begin_transaction().await
    }

    /// Run `body` inside a transaction, committing on success and rolling back
    /// on any error (including one raised by `body` itself).
    pub async fn execute_in_transaction<F, Fut, T>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut Box<dyn codeindex_domain::ports::GraphTransaction>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut transaction = self.begin_transaction().await?;
        match body(&mut transaction).await {
            Ok(value) => {
                transaction.commit().await?;
                self.blast_radius_cache.invalidate_all();
                Ok(value)
            }
            Err(e) => {
                transaction.rollback().await.ok();
                Err(e)
            }
        }
    }

    // ---- observability / lifecycle -----------------------------------------

    /// Current metrics snapshot.
    #[must_use]
    pub async fn metrics(&self) -> GraphServiceMetrics {
        let retry = self.retry_metrics.lock().await;
        let validation = *self.validation_failures.lock().unwrap_or_else(|e| e.into_inner());
        GraphServiceMetrics {
            pool: self.pool.metrics().into(),
            total_errors: retry.total_errors,
            connection_errors: retry.connection_errors,
            deadlock_count: retry.deadlock_count,
            retries_attempted: retry.retries_attempted,
            slow_queries: self.slow_queries.load(Ordering::SeqCst),
            validation_failures: validation,
        }
    }

    /// Whether the underlying connection currently appears healthy.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.health.as_ref().map(|h| h.is_connected()).unwrap_or(true)
    }

    /// Close the service: idempotent, drains in-flight operations up to
    /// [`SHUTDOWN_DRAIN_TIMEOUT_MS`], stops the health monitor, and closes
    /// every idle pooled session.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(handle) = self.health_handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }

        let drained = tokio::time::timeout(
            Duration::from_millis(SHUTDOWN_DRAIN_TIMEOUT_MS),
            wait_for_drain(Arc::clone(&self.active_operations)),
        )
        .await
        .is_ok();

        self.pool.close_all().await;
        let metrics = self.metrics().await;
        info!(
            graceful = drained,
            total_errors = metrics.total_errors,
            slow_queries = metrics.slow_queries,
            "graph service closed"
        );
        Ok(())
    }
}

async fn wait_for_drain(counter: Arc<AtomicU64>) {
    while counter.load(Ordering::SeqCst) > 0 {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

struct OperationGuard {
    counter: Arc<AtomicU64>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn stacked_statements_are_refused() {
        assert!(looks_unsafe("MATCH (n) RETURN n; MATCH (m) DELETE m").is_some());
    }

    #[test]
    fn drop_is_refused() {
        assert!(looks_unsafe("DROP DATABASE neo4j").is_some());
    }

    #[test]
    fn ordinary_parameterized_query_is_allowed() {
        assert!(looks_unsafe("MATCH (n:CodeNode {id: $id}) RETURN n").is_none());
    }

    #[test]
    fn counts_from_records_deduplicates_files_and_counts_tests() {
        let mut node_a = HashMap::new();
        node_a.insert("file_path".to_owned(), GraphValue::Str("a.rs".to_owned()));
        node_a.insert("node_type".to_owned(), GraphValue::Str("function".to_owned()));
        let mut node_b = HashMap::new();
        node_b.insert("file_path".to_owned(), GraphValue::Str("a.rs".to_owned()));
        node_b.insert("node_type".to_owned(), GraphValue::Str("test".to_owned()));
        let records = vec![
            GraphRecord::new(HashMap::from([("impacted".to_owned(), GraphValue::Map(node_a))])),
            GraphRecord::new(HashMap::from([("impacted".to_owned(), GraphValue::Map(node_b))])),
        ];
        let counts = GraphService::counts_from_records(&records, "impacted");
        assert_eq!(counts.impacted_nodes, 2);
        assert_eq!(counts.impacted_files, 1);
        assert_eq!(counts.test_count, 1);
    }
}
