//! Graph Service: pooled, circuit-broken, retrying access to the graph
//! backend, plus blast-radius/change-safety analysis over it.

pub mod blast_radius;
pub mod circuit_breaker;
pub mod classify;
pub mod health;
pub mod pool;
pub mod retry;
pub mod risk;
pub mod service;
pub mod validation;

pub use blast_radius::{BlastRadiusCache, BlastRadiusCacheConfig};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use health::{HealthMonitor, HealthMonitorConfig};
pub use pool::{PoolConfig, PoolMetrics, SessionPool};
pub use retry::{RetryMetrics, RetryPolicy};
pub use risk::{assess_change_safety, risk_score, safety_level, ChangeSafetyAssessment, ImpactCounts, SafetyLevel};
pub use service::{GraphService, GraphServiceConfig, GraphServiceMetrics};
pub use validation::{validate_node, validate_relationship, ValidationFailureCounters, ValidationFinding};
