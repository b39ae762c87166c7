//! Configuration schema: the full set of tunables the application accepts.

use serde::{Deserialize, Serialize};

/// Top-level application configuration. Deserialized via `figment` from TOML plus
/// environment overrides; every bound has a hard min/max enforced by
/// [`super::validator`] and a "recommended" sub-range used only for warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config_schema_version: Option<String>,

    pub neo4j_url: Option<String>,
    pub neo4j_username: Option<String>,
    pub neo4j_password: Option<String>,
    pub neo4j_database: Option<String>,
    pub neo4j_enabled: bool,

    pub embedder_provider: Option<String>,
    pub embedder_api_key: Option<String>,

    pub max_connection_pool_size: u32,
    pub connection_acquisition_timeout_ms: u64,
    pub max_connection_lifetime_ms: u64,

    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,

    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout_ms: u64,

    pub health_check_interval_ms: u64,
    pub query_timeout_ms: u64,

    pub encrypted: Option<bool>,

    pub metadata_validation_enabled: bool,
    pub max_metadata_size: usize,
    pub max_metadata_string_length: usize,
    pub max_metadata_array_length: usize,
    pub max_metadata_object_depth: usize,
    pub allow_metadata_truncation: bool,

    pub batch_segment_threshold: usize,
    pub max_batch_retries: u32,
    pub initial_pipeline_retry_delay_ms: u64,
    pub max_pending_batches: usize,
    pub parsing_concurrency: usize,
    pub batch_processing_concurrency: usize,

    pub slow_query_threshold_ms: u64,
    pub blast_radius_cache_ttl_ms: u64,
    pub blast_radius_cache_size: u64,

    pub is_configured: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        use codeindex_domain::constants::*;
        Self {
            config_schema_version: None,
            neo4j_url: None,
            neo4j_username: None,
            neo4j_password: None,
            neo4j_database: None,
            neo4j_enabled: false,
            embedder_provider: None,
            embedder_api_key: None,
            max_connection_pool_size: DEFAULT_POOL_SIZE,
            connection_acquisition_timeout_ms: DEFAULT_ACQUISITION_TIMEOUT_MS,
            max_connection_lifetime_ms: DEFAULT_CONNECTION_LIFETIME_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_retry_delay_ms: DEFAULT_INITIAL_RETRY_DELAY_MS,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            circuit_breaker_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            circuit_breaker_timeout_ms: DEFAULT_CIRCUIT_BREAKER_TIMEOUT_MS,
            health_check_interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            encrypted: None,
            metadata_validation_enabled: true,
            max_metadata_size: DEFAULT_MAX_METADATA_SIZE_BYTES,
            max_metadata_string_length: DEFAULT_MAX_METADATA_STRING_LENGTH,
            max_metadata_array_length: DEFAULT_MAX_METADATA_ARRAY_LENGTH,
            max_metadata_object_depth: DEFAULT_MAX_METADATA_OBJECT_DEPTH,
            allow_metadata_truncation: true,
            batch_segment_threshold: DEFAULT_BATCH_SEGMENT_THRESHOLD,
            max_batch_retries: DEFAULT_MAX_BATCH_RETRIES,
            initial_pipeline_retry_delay_ms: DEFAULT_PIPELINE_INITIAL_RETRY_DELAY_MS,
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
            parsing_concurrency: DEFAULT_PARSING_CONCURRENCY,
            batch_processing_concurrency: DEFAULT_BATCH_PROCESSING_CONCURRENCY,
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            blast_radius_cache_ttl_ms: DEFAULT_BLAST_RADIUS_CACHE_TTL_MS,
            blast_radius_cache_size: DEFAULT_BLAST_RADIUS_CACHE_SIZE,
            is_configured: false,
        }
    }
}

/// Infers the `encrypted` default from a connection URL's scheme when the config
/// doesn't set it explicitly.
#[must_use]
pub fn infer_encrypted_from_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["https://", "wss://", "bolt+s://", "neo4j+s://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
