//! Connection error classification for the retry layer.
//!
//! An error is connection-related iff it carries a known structured code or name,
//! OR — only as a last resort, when no structured fields are present — its
//! message contains one of a small set of timeout substrings. The classifier
//! deliberately does NOT treat bare substrings like "connection", "pool",
//! "network", or "ECONNREFUSED" as connection errors: that would cause false
//! positives on ordinary application errors that happen to mention those words.

const STRUCTURED_CODES: &[&str] = &[
    "ServiceUnavailable",
    "SessionExpired",
    "Security.AUTHTOKEN",
    "Transaction.Terminated",
    "Network.Unreachable",
    "Database.Unavailable",
    "DeadlockDetected",
    "TransactionCommitFailed",
];

const STRUCTURED_NAMES: &[&str] = &[
    "Neo4jError",
    "ConnectionError",
    "ServiceUnavailableError",
    "SessionExpiredError",
];

const TIMEOUT_FALLBACK_SUBSTRINGS: &[&str] =
    &["timeout", "etimedout", "connection timeout", "connect timeout"];

/// A structured classification input: a backend error with optional structured
/// fields and a free-text message.
#[derive(Debug, Clone, Default)]
pub struct ClassifiableError<'a> {
    pub code: Option<&'a str>,
    pub name: Option<&'a str>,
    pub message: &'a str,
}

/// Whether `error` should be classified as connection-related for retry purposes.
#[must_use]
pub fn is_connection_error(error: &ClassifiableError<'_>) -> bool {
    if let Some(code) = error.code {
        if STRUCTURED_CODES.iter().any(|c| *c == code) {
            return true;
        }
    }
    if let Some(name) = error.name {
        if STRUCTURED_NAMES.iter().any(|n| *n == name) {
            return true;
        }
    }
    if error.code.is_none() && error.name.is_none() {
        let lower = error.message.to_ascii_lowercase();
        return TIMEOUT_FALLBACK_SUBSTRINGS
            .iter()
            .any(|pat| lower.contains(pat));
    }
    false
}

/// Whether `error`'s structured code identifies it as a deadlock.
#[must_use]
pub fn is_deadlock_error(error: &ClassifiableError<'_>) -> bool {
    matches!(error.code, Some("DeadlockDetected"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_code_service_unavailable_is_connection() {
        let err = ClassifiableError {
            code: Some("ServiceUnavailable"),
            name: None,
            message: "unused",
        };
        assert!(is_connection_error(&err));
    }

    #[test]
    fn structured_name_session_expired_is_connection() {
        let err = ClassifiableError {
            code: None,
            name: Some("SessionExpiredError"),
            message: "unused",
        };
        assert!(is_connection_error(&err));
    }

    #[test]
    fn bare_connection_substring_is_not_connection() {
        let err = ClassifiableError {
            code: None,
            name: None,
            message: "connection",
        };
        assert!(!is_connection_error(&err));
    }

    #[test]
    fn etimedout_fallback_is_connection() {
        let err = ClassifiableError {
            code: None,
            name: None,
            message: "ETIMEDOUT",
        };
        assert!(is_connection_error(&err));
    }

    #[test]
    fn bare_econnrefused_is_not_connection() {
        let err = ClassifiableError {
            code: None,
            name: None,
            message: "ECONNREFUSED: connection refused by pool on network",
        };
        assert!(!is_connection_error(&err));
    }

    #[test]
    fn structured_fields_present_skip_message_fallback() {
        // A structured code/name takes precedence; a message containing
        // "timeout" on an otherwise-unclassified structured error must NOT be
        // promoted to connection-related by the fallback path.
        let err = ClassifiableError {
            code: Some("SomeOtherCode"),
            name: None,
            message: "timeout waiting for lock",
        };
        assert!(!is_connection_error(&err));
    }

    #[test]
    fn deadlock_detected_is_classified_separately() {
        let err = ClassifiableError {
            code: Some("DeadlockDetected"),
            name: None,
            message: "unused",
        };
        assert!(is_connection_error(&err));
        assert!(is_deadlock_error(&err));
    }
}
