//! Error taxonomy for the codeindex core.
//!
//! Configuration, connection, timeout, validation, and operational failures
//! each get their own variant rather than a single opaque string, so callers
//! can match on the failure mode instead of parsing messages.

use thiserror::Error;

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the codeindex core.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// A configuration value failed validation.
    #[error("Configuration error for '{field}': {message}")]
    Configuration {
        /// The offending field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// A numeric or structural bound was violated and the caller requested strict
    /// (non-clamping) enforcement.
    #[error("Value {value} out of bounds [{min}, {max}] for '{field}'")]
    OutOfBounds {
        /// The field name.
        field: String,
        /// The rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Metadata sanitization failed in a way the sanitizer cannot paper over
    /// (circular reference, or size limit exceeded with truncation disallowed).
    #[error("Metadata validation failed during {operation}: {message}")]
    MetadataValidation {
        /// The operation in progress (e.g. "createRelationship").
        operation: String,
        /// Reason for the failure.
        message: String,
    },

    /// Node or relationship shape failed validation.
    #[error("Validation error on '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// Reason for the failure.
        message: String,
    },

    /// The connection to the backend (graph or vector store) failed in a way
    /// classified as retryable/connection-related.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication to the backend failed. Not retried; aborts initialization.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Description of the failure.
        message: String,
    },

    /// The requested database does not exist. Not retried; aborts initialization.
    #[error("Database unavailable: {message}")]
    DatabaseUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// An operation exceeded its allotted time budget.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured timeout, in milliseconds.
        timeout_ms: u64,
    },

    /// The circuit breaker is open and is rejecting requests fast.
    #[error("Circuit breaker is open — rejecting requests")]
    CircuitOpen,

    /// A query was refused because it looked like it embedded unsanitized input.
    #[error("Query refused: {message}")]
    UnsafeQuery {
        /// Reason the query was refused.
        message: String,
    },

    /// A requested resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// An operation was cancelled cooperatively.
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },

    /// A transaction handle was used after it had already been closed.
    #[error("Transaction already closed")]
    TransactionClosed,

    /// Catch-all for failures from an external collaborator (parser, embedder,
    /// vector store) that don't fit a more specific variant.
    #[error("{component} error: {message}")]
    External {
        /// The collaborator that failed (e.g. "embedder", "vector-store").
        component: String,
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Construct an [`Error::Io`] from a display-able source.
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Construct an [`Error::Connection`] with no source.
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Construct an [`Error::External`] error.
    pub fn external(component: impl Into<String>, message: impl Into<String>) -> Self {
        Error::External {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether this error should be classified as connection-related for retry
    /// purposes. See the connection classifier in the graph service for the
    /// authoritative (structured-code-aware) classification; this is the
    /// coarse domain-level check used when no structured code is available.
    #[must_use]
    pub fn is_connection_like(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}
