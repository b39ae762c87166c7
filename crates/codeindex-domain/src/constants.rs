//! Numeric defaults and bounds shared across the graph service, pipeline, and
//! configuration layers. One constant group per concern, re-exported flatly
//! here since the core has a single concern per constant (no risk of name
//! collisions across sub-modules).

/// Connection pool bounds.
pub const MIN_POOL_SIZE: u32 = 1;
pub const MAX_POOL_SIZE: u32 = 100;
pub const DEFAULT_POOL_SIZE: u32 = 50;

pub const MIN_ACQUISITION_TIMEOUT_MS: u64 = 1_000;
pub const MAX_ACQUISITION_TIMEOUT_MS: u64 = 5 * 60 * 1_000;
pub const DEFAULT_ACQUISITION_TIMEOUT_MS: u64 = 30_000;

pub const MIN_CONNECTION_LIFETIME_MS: u64 = 60_000;
pub const MAX_CONNECTION_LIFETIME_MS: u64 = 24 * 60 * 60 * 1_000;
pub const DEFAULT_CONNECTION_LIFETIME_MS: u64 = 60 * 60 * 1_000;

/// Retry/backoff defaults.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const JITTER_FRACTION: f64 = 0.1;

/// Circuit breaker defaults.
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_CIRCUIT_BREAKER_TIMEOUT_MS: u64 = 60_000;
pub const DEADLOCK_TRIP_THRESHOLD: u32 = 5;

/// Health monitor defaults.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 30_000;
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 10_000;

/// Query timeout default.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// Shutdown drain budget.
pub const SHUTDOWN_DRAIN_TIMEOUT_MS: u64 = 30_000;

/// Blast-radius cache.
pub const DEFAULT_BLAST_RADIUS_CACHE_TTL_MS: u64 = 5 * 60 * 1_000;
pub const DEFAULT_BLAST_RADIUS_CACHE_SIZE: u64 = 100;
pub const MIN_MAX_DEPTH: u32 = 1;
pub const MAX_MAX_DEPTH: u32 = 10;

/// Slow query logging threshold default.
pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 5_000;

/// Metadata sanitizer defaults.
pub const DEFAULT_MAX_METADATA_SIZE_BYTES: usize = 8_192;
pub const DEFAULT_MAX_METADATA_STRING_LENGTH: usize = 1_024;
pub const DEFAULT_MAX_METADATA_ARRAY_LENGTH: usize = 100;
pub const DEFAULT_MAX_METADATA_OBJECT_DEPTH: usize = 5;

/// Scanner pipeline defaults.
pub const DEFAULT_BATCH_SEGMENT_THRESHOLD: usize = 200;
pub const DEFAULT_MAX_BATCH_RETRIES: u32 = 3;
pub const DEFAULT_PIPELINE_INITIAL_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_PENDING_BATCHES: usize = 4;
pub const DEFAULT_PARSING_CONCURRENCY: usize = 4;
pub const DEFAULT_BATCH_PROCESSING_CONCURRENCY: usize = 2;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1_000_000;
pub const GRAPH_PIPELINE_BREAKER_TRIP_THRESHOLD: u32 = 3;
pub const GRAPH_PIPELINE_BREAKER_TIMEOUT_MS: u64 = 5 * 60 * 1_000;

/// `clearAll` page size.
pub const CLEAR_ALL_PAGE_SIZE: u32 = 10_000;

/// Error log sink buffering.
pub const ERROR_LOG_BUFFER_CAPACITY: usize = 100;
pub const ERROR_LOG_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Current configuration schema version.
pub const CURRENT_CONFIG_SCHEMA_VERSION: &str = "1.0.0";
