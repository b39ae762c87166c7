use std::sync::Arc;
use std::time::Duration;

use codeindex_domain::entities::{CodeNode, CodeRelationship, NodeType, RelationshipMetadata, RelationshipType};
use codeindex_domain::error::Error;
use codeindex_domain::ports::{GraphDriver, GraphValue};
use codeindex_infrastructure::graph::{GraphService, GraphServiceConfig};
use codeindex_providers::InMemoryGraphDriver;

fn node(id: &str, file_path: &str) -> CodeNode {
    CodeNode {
        id: id.to_owned(),
        node_type: NodeType::Function,
        name: id.to_owned(),
        file_path: file_path.to_owned(),
        start_line: 0,
        end_line: 5,
        language: Some("rust".to_owned()),
    }
}

fn relationship(from: &str, to: &str, rel_type: RelationshipType) -> CodeRelationship {
    CodeRelationship {
        from_id: from.to_owned(),
        to_id: to.to_owned(),
        rel_type,
        metadata: RelationshipMetadata::default(),
    }
}

fn fast_config() -> GraphServiceConfig {
    let mut config = GraphServiceConfig::default();
    config.query_timeout = Duration::from_secs(5);
    config.health.interval = Duration::from_secs(3600);
    config.retry.max_retries = 0;
    config
}

#[tokio::test]
async fn upsert_then_find_callers_round_trips() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(driver, fast_config());

    service.upsert_node(&node("a", "a.rs")).await.unwrap();
    service.upsert_node(&node("b", "b.rs")).await.unwrap();
    service
        .create_relationship(&relationship("a", "b", RelationshipType::Calls))
        .await
        .unwrap();

    let callers = service.find_callers("b").await.unwrap();
    assert_eq!(callers.len(), 1);

    service.close().await.unwrap();
}

#[tokio::test]
async fn delete_nodes_by_file_path_removes_matching_nodes_only() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(Arc::clone(&driver) as Arc<dyn GraphDriver>, fast_config());

    service.upsert_node(&node("a", "a.rs")).await.unwrap();
    service.upsert_node(&node("b", "b.rs")).await.unwrap();
    assert_eq!(driver.node_count().await, 2);

    service.delete_nodes_by_file_path("a.rs").await.unwrap();
    assert_eq!(driver.node_count().await, 1);

    service.close().await.unwrap();
}

#[tokio::test]
async fn upsert_node_with_empty_id_is_rejected_before_reaching_the_driver() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(Arc::clone(&driver) as Arc<dyn GraphDriver>, fast_config());

    let mut bad = node("", "a.rs");
    bad.id.clear();
    let result = service.upsert_node(&bad).await;
    assert!(matches!(result, Err(Error::Validation { .. })));
    assert_eq!(driver.node_count().await, 0);

    service.close().await.unwrap();
}

#[tokio::test]
async fn blast_radius_is_cached_across_repeated_calls() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(driver, fast_config());

    service.upsert_node(&node("a", "a.rs")).await.unwrap();
    service.upsert_node(&node("b", "b.rs")).await.unwrap();
    service
        .create_relationship(&relationship("b", "a", RelationshipType::Calls))
        .await
        .unwrap();

    let first = service.calculate_blast_radius("a", 2).await.unwrap();
    let second = service.calculate_blast_radius("a", 2).await.unwrap();
    assert_eq!(first.score, second.score);
    assert_eq!(first.counts.impacted_nodes, 1);

    service.close().await.unwrap();
}

#[tokio::test]
async fn blast_radius_folds_dependency_count_and_target_found() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(driver, fast_config());

    service.upsert_node(&node("a", "a.rs")).await.unwrap();
    service.upsert_node(&node("b", "b.rs")).await.unwrap();
    service
        .create_relationship(&relationship("a", "b", RelationshipType::Calls))
        .await
        .unwrap();

    let assessment = service.calculate_blast_radius("a", 2).await.unwrap();
    assert_eq!(assessment.counts.dependency_count, 1);
    assert!(assessment.counts.target_found);
    assert!(!assessment.reasons.is_empty());
    assert!(!assessment.recommendations.is_empty());

    service.close().await.unwrap();
}

#[tokio::test]
async fn relationship_metadata_is_sanitized_and_persisted_on_the_edge() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(Arc::clone(&driver) as Arc<dyn GraphDriver>, fast_config());

    service.upsert_node(&node("a", "a.rs")).await.unwrap();
    service.upsert_node(&node("b", "b.rs")).await.unwrap();

    let mut metadata = RelationshipMetadata {
        parent_class: Some("Base".to_owned()),
        ..Default::default()
    };
    metadata
        .extra
        .insert("note".to_owned(), serde_json::Value::String("hand-off".to_owned()));

    let relationship = CodeRelationship {
        from_id: "a".to_owned(),
        to_id: "b".to_owned(),
        rel_type: RelationshipType::Extends,
        metadata,
    };
    service.create_relationship(&relationship).await.unwrap();

    let stored = driver.edge_metadata("a", "b", "EXTENDS").await.unwrap();
    assert_eq!(
        stored.get("parent_class").and_then(GraphValue::as_str),
        Some("Base")
    );
    assert_eq!(stored.get("note").and_then(GraphValue::as_str), Some("hand-off"));

    service.close().await.unwrap();
}

#[tokio::test]
async fn disconnected_backend_write_and_read_return_safe_defaults() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    driver.set_healthy(false);
    let mut config = fast_config();
    config.health.interval = Duration::from_millis(5);
    let service = GraphService::new(Arc::clone(&driver) as Arc<dyn GraphDriver>, config);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!service.is_connected());

    let write_result = service.upsert_node(&node("a", "a.rs")).await;
    assert!(write_result.is_ok());
    assert_eq!(driver.node_count().await, 0);

    let read_result = service.find_callers("a").await.unwrap();
    assert!(read_result.is_empty());

    service.close().await.unwrap();
}

#[tokio::test]
async fn stacked_statements_are_refused_by_execute_query() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(driver, fast_config());

    let result = service
        .execute_query(
            "MATCH (n) RETURN n; MATCH (m) DETACH DELETE m",
            Default::default(),
        )
        .await;
    assert!(matches!(result, Err(Error::UnsafeQuery { .. })));

    service.close().await.unwrap();
}

#[tokio::test]
async fn service_closed_rejects_further_operations() {
    let driver = Arc::new(InMemoryGraphDriver::new());
    let service = GraphService::new(driver, fast_config());
    service.close().await.unwrap();

    let result = service.upsert_node(&node("a", "a.rs")).await;
    assert!(result.is_err());
}
