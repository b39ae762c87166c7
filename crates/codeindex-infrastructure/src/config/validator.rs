//! Config Validator (C2, validator half).
//!
//! Bounds enforcement, structured credential validation, and production-safety
//! heuristics. Every check returns structured data rather than throwing; only
//! [`enforce_numeric_bounds`] in strict mode raises [`Error::OutOfBounds`].

use codeindex_domain::error::{Error, Result};

use super::types::AppConfig;

/// What a bounds check decided to do with an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsAction {
    Rejected,
    Clamped,
    Accepted,
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single bounds violation (or accepted-but-outside-recommended) finding.
#[derive(Debug, Clone)]
pub struct BoundsViolation {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub action: BoundsAction,
    pub severity: Severity,
}

/// A structured validation finding with a machine-readable code.
#[derive(Debug, Clone)]
pub struct Finding {
    pub code: &'static str,
    pub field: String,
    pub message: String,
}

/// Validate that `value` lies within `[min, max]`; NaN/±∞ are always rejected.
/// A value inside the hard bounds but outside the `recommended` sub-range is
/// reported as `Accepted` with `Warning` severity.
#[must_use]
pub fn validate_numeric_bounds(
    value: Option<f64>,
    min: f64,
    max: f64,
    recommended: Option<(f64, f64)>,
) -> (bool, Option<BoundsViolation>) {
    let Some(value) = value else {
        return (true, None);
    };
    if value.is_nan() || value.is_infinite() {
        return (
            false,
            Some(BoundsViolation {
                value,
                min,
                max,
                action: BoundsAction::Rejected,
                severity: Severity::Error,
            }),
        );
    }
    if value < min || value > max {
        return (
            false,
            Some(BoundsViolation {
                value,
                min,
                max,
                action: BoundsAction::Rejected,
                severity: Severity::Error,
            }),
        );
    }
    if let Some((rmin, rmax)) = recommended {
        if value < rmin || value > rmax {
            return (
                true,
                Some(BoundsViolation {
                    value,
                    min: rmin,
                    max: rmax,
                    action: BoundsAction::Accepted,
                    severity: Severity::Warning,
                }),
            );
        }
    }
    (true, None)
}

/// Whether `value` lies within `[min, max]`.
#[must_use]
pub fn is_within_bounds(value: f64, min: f64, max: f64) -> bool {
    !value.is_nan() && value >= min && value <= max
}

/// Whether `value` lies within the recommended sub-range.
#[must_use]
pub fn is_within_recommended_bounds(value: f64, recommended: (f64, f64)) -> bool {
    is_within_bounds(value, recommended.0, recommended.1)
}

/// Clamp `value` into `[lo, hi]`. The result is always in range, and equals
/// `value` whenever `value` was already in range.
#[must_use]
pub fn clamp_value(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Clamp `value` into `[min, max]`, or reject it with [`Error::OutOfBounds`] when
/// `strict` is set.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] when `strict` is true and `value` lies outside
/// `[min, max]`.
pub fn enforce_numeric_bounds(
    field: &str,
    value: f64,
    min: f64,
    max: f64,
    strict: bool,
) -> Result<f64> {
    if is_within_bounds(value, min, max) {
        return Ok(value);
    }
    if strict {
        return Err(Error::OutOfBounds {
            field: field.to_owned(),
            value,
            min,
            max,
        });
    }
    Ok(clamp_value(value, min, max))
}

/// Validate a string's length. Distinguishes a wrong-type call (caller already
/// has something other than a UTF-8 string) from a too-short/too-long string;
/// `None` passes through as valid (absent).
#[must_use]
pub fn validate_string_length(
    value: Option<&str>,
    min: usize,
    max: usize,
    field: &str,
) -> (bool, Option<Finding>) {
    let Some(value) = value else {
        return (true, None);
    };
    let len = value.chars().count();
    if len < min || len > max {
        return (
            false,
            Some(Finding {
                code: "INVALID_LENGTH",
                field: field.to_owned(),
                message: format!("length {len} not in [{min}, {max}]"),
            }),
        );
    }
    (true, None)
}

/// Validate a URL string: scheme allowlist, basic structural sanity (including
/// IPv4, bracketed IPv6 literals, and percent-encoded paths), and a length cap.
#[must_use]
pub fn validate_url(url: Option<&str>, allowed_protocols: &[&str], field: &str) -> (bool, Option<Finding>) {
    let Some(url) = url else {
        return (true, None);
    };
    if url.len() > 2048 {
        return (
            false,
            Some(Finding {
                code: "INVALID_LENGTH",
                field: field.to_owned(),
                message: "URL exceeds maximum length of 2048 characters".to_owned(),
            }),
        );
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return (
            false,
            Some(Finding {
                code: "INVALID_URL",
                field: field.to_owned(),
                message: format!("'{url}' is not a valid URL"),
            }),
        );
    };
    if !allowed_protocols.iter().any(|p| p.eq_ignore_ascii_case(scheme)) {
        return (
            false,
            Some(Finding {
                code: "INVALID_PROTOCOL",
                field: field.to_owned(),
                message: format!(
                    "protocol '{scheme}' not in allowed set {allowed_protocols:?}"
                ),
            }),
        );
    }
    if rest.is_empty() {
        return (
            false,
            Some(Finding {
                code: "INVALID_URL",
                field: field.to_owned(),
                message: "URL has no host".to_owned(),
            }),
        );
    }
    // Accept bracketed IPv6 literals ([::1]:7687), bare IPv4/hostnames, and a
    // percent-encoded path/query tail — we don't need a full RFC 3986 parser,
    // only enough structural sanity to reject obvious garbage.
    let host_part = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    if host_part.is_empty() {
        return (
            false,
            Some(Finding {
                code: "INVALID_URL",
                field: field.to_owned(),
                message: "URL has no host".to_owned(),
            }),
        );
    }
    (true, None)
}

const TEST_SECRET_SUBSTRINGS: &[&str] = &[
    "test", "example", "your_key_here", "replace_me", "dummy",
];

/// Validate an API key's length and flag likely-placeholder or suspicious values
/// as warnings (never errors — the key may still work).
#[must_use]
pub fn validate_api_key(
    key: Option<&str>,
    min_len: usize,
    max_len: usize,
    field: &str,
) -> (bool, Vec<Finding>) {
    let Some(key) = key else {
        return (true, Vec::new());
    };
    let mut warnings = Vec::new();
    if key.len() < min_len || key.len() > max_len {
        return (
            false,
            vec![Finding {
                code: "INVALID_LENGTH",
                field: field.to_owned(),
                message: format!("API key length {} not in [{min_len}, {max_len}]", key.len()),
            }],
        );
    }
    let lower = key.to_ascii_lowercase();
    if TEST_SECRET_SUBSTRINGS.iter().any(|pat| lower.contains(pat)) {
        warnings.push(Finding {
            code: "TEST_SECRET_DETECTED",
            field: field.to_owned(),
            message: "API key resembles a placeholder/test credential".to_owned(),
        });
    }
    let all_same = key.bytes().all(|b| b == key.as_bytes()[0]);
    let all_digits = key.bytes().all(|b| b.is_ascii_digit());
    if all_same || all_digits {
        warnings.push(Finding {
            code: "SUSPICIOUS_SECRET_PATTERN",
            field: field.to_owned(),
            message: "API key has a suspicious low-entropy pattern".to_owned(),
        });
    }
    (true, warnings)
}

/// Aggregated metadata about a full [`validate_config`] run.
#[derive(Debug, Clone)]
pub struct ValidationMetadata {
    pub version: String,
    pub duration: std::time::Duration,
    pub reachability_checked: bool,
}

/// Aggregated result of validating an entire [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub metadata: ValidationMetadata,
}

/// Validate an entire config against its documented numeric and string bounds.
#[must_use]
pub fn validate_config(config: &AppConfig) -> ConfigValidationResult {
    let started = std::time::Instant::now();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    macro_rules! check_bounds {
        ($field:expr, $value:expr, $min:expr, $max:expr) => {
            let (ok, violation) =
                validate_numeric_bounds(Some($value as f64), $min as f64, $max as f64, None);
            if !ok {
                errors.push(Finding {
                    code: "OUT_OF_BOUNDS",
                    field: $field.to_owned(),
                    message: format!("{} must be within [{}, {}]", $field, $min, $max),
                });
            } else if let Some(v) = violation {
                if v.severity == Severity::Warning {
                    warnings.push(Finding {
                        code: "OUTSIDE_RECOMMENDED_RANGE",
                        field: $field.to_owned(),
                        message: format!("{} is outside the recommended range", $field),
                    });
                }
            }
        };
    }

    use codeindex_domain::constants::*;
    check_bounds!(
        "maxConnectionPoolSize",
        config.max_connection_pool_size,
        MIN_POOL_SIZE,
        MAX_POOL_SIZE
    );
    check_bounds!(
        "connectionAcquisitionTimeout",
        config.connection_acquisition_timeout_ms,
        MIN_ACQUISITION_TIMEOUT_MS,
        MAX_ACQUISITION_TIMEOUT_MS
    );
    check_bounds!(
        "maxConnectionLifetime",
        config.max_connection_lifetime_ms,
        MIN_CONNECTION_LIFETIME_MS,
        MAX_CONNECTION_LIFETIME_MS
    );

    if let Some(url) = config.neo4j_url.as_deref() {
        let (ok, finding) =
            validate_url(Some(url), &["bolt", "neo4j", "bolt+s", "neo4j+s", "https", "wss"], "neo4jUrl");
        if !ok {
            if let Some(finding) = finding {
                errors.push(finding);
            }
        }
    }

    if let Some(key) = config.embedder_api_key.as_deref() {
        let (ok, findings) = validate_api_key(Some(key), 16, 256, "embedderApiKey");
        if !ok {
            errors.extend(findings);
        } else {
            warnings.extend(findings);
        }
    }

    let production_warnings = check_production_safety(config);
    warnings.extend(production_warnings);

    ConfigValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
        metadata: ValidationMetadata {
            version: config
                .config_schema_version
                .clone()
                .unwrap_or_else(|| CURRENT_CONFIG_SCHEMA_VERSION.to_owned()),
            duration: started.elapsed(),
            reachability_checked: false,
        },
    }
}

/// Production-safety heuristics: flags config shapes that are fine for local
/// development but risky to run with in a production deployment.
#[must_use]
pub fn check_production_safety(config: &AppConfig) -> Vec<Finding> {
    let mut warnings = Vec::new();

    if config.circuit_breaker_threshold == 0 {
        warnings.push(Finding {
            code: "PRODUCTION_SAFETY",
            field: "circuitBreakerThreshold".to_owned(),
            message: "Circuit breaker is effectively disabled (threshold 0)".to_owned(),
        });
    }

    if let Some(key) = config.embedder_api_key.as_deref() {
        let lower = key.to_ascii_lowercase();
        if TEST_SECRET_SUBSTRINGS.iter().any(|p| lower.contains(p)) {
            warnings.push(Finding {
                code: "PRODUCTION_SAFETY",
                field: "embedderApiKey".to_owned(),
                message: "Test/placeholder secret detected in what looks like a production config".to_owned(),
            });
        }
    }

    if !(10..=5_000).contains(&config.batch_segment_threshold) {
        warnings.push(Finding {
            code: "PRODUCTION_SAFETY",
            field: "batchSegmentThreshold".to_owned(),
            message: "Batch size is outside the recommended 10-5000 range".to_owned(),
        });
    }

    if config.max_connection_pool_size < 5 {
        warnings.push(Finding {
            code: "PRODUCTION_SAFETY",
            field: "maxConnectionPoolSize".to_owned(),
            message: "Pool size below 5 risks acquisition contention under load".to_owned(),
        });
    }

    if config.query_timeout_ms > 5 * 60 * 1_000 {
        warnings.push(Finding {
            code: "PRODUCTION_SAFETY",
            field: "queryTimeout".to_owned(),
            message: "Query timeout exceeds 5 minutes".to_owned(),
        });
    }

    if config.max_retries == 0 {
        warnings.push(Finding {
            code: "PRODUCTION_SAFETY",
            field: "maxRetries".to_owned(),
            message: "Retries disabled; transient failures will not be recovered".to_owned(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(f64::NAN, false)]
    #[case(f64::INFINITY, false)]
    #[case(5.0, true)]
    #[case(0.0, false)]
    #[case(101.0, false)]
    fn numeric_bounds_cases(#[case] value: f64, #[case] expected_valid: bool) {
        let (valid, _) = validate_numeric_bounds(Some(value), 1.0, 100.0, None);
        assert_eq!(valid, expected_valid);
    }

    #[test]
    fn absent_value_passes() {
        let (valid, violation) = validate_numeric_bounds(None, 1.0, 100.0, None);
        assert!(valid);
        assert!(violation.is_none());
    }

    #[test]
    fn accepted_outside_recommended_is_a_warning() {
        let (valid, violation) = validate_numeric_bounds(Some(2.0), 1.0, 100.0, Some((10.0, 50.0)));
        assert!(valid);
        let v = violation.unwrap();
        assert_eq!(v.action, BoundsAction::Accepted);
        assert_eq!(v.severity, Severity::Warning);
    }

    #[test]
    fn clamp_value_never_leaves_range() {
        assert_eq!(clamp_value(150.0, 0.0, 100.0), 100.0);
        assert_eq!(clamp_value(-10.0, 0.0, 100.0), 0.0);
        assert_eq!(clamp_value(42.0, 0.0, 100.0), 42.0);
    }

    #[test]
    fn enforce_numeric_bounds_strict_rejects() {
        let err = enforce_numeric_bounds("pool", 500.0, 1.0, 100.0, true).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn enforce_numeric_bounds_lenient_clamps() {
        let clamped = enforce_numeric_bounds("pool", 500.0, 1.0, 100.0, false).unwrap();
        assert_eq!(clamped, 100.0);
    }

    #[test]
    fn api_key_placeholder_detection() {
        let (valid, findings) = validate_api_key(Some("sk-test-1234567890"), 8, 128, "apiKey");
        assert!(valid);
        assert!(findings.iter().any(|f| f.code == "TEST_SECRET_DETECTED"));
    }

    #[test]
    fn api_key_suspicious_pattern_all_digits() {
        let (valid, findings) = validate_api_key(Some("11111111111111"), 8, 128, "apiKey");
        assert!(valid);
        assert!(findings.iter().any(|f| f.code == "SUSPICIOUS_SECRET_PATTERN"));
    }

    #[test]
    fn url_validation_rejects_bad_protocol() {
        let (valid, finding) = validate_url(Some("ftp://host/path"), &["bolt", "neo4j"], "url");
        assert!(!valid);
        assert_eq!(finding.unwrap().code, "INVALID_PROTOCOL");
    }

    #[test]
    fn url_validation_accepts_bracketed_ipv6() {
        let (valid, _) = validate_url(Some("bolt://[::1]:7687"), &["bolt"], "url");
        assert!(valid);
    }

    #[test]
    fn production_safety_flags_disabled_breaker() {
        let mut config = AppConfig::default();
        config.circuit_breaker_threshold = 0;
        let findings = check_production_safety(&config);
        assert!(findings.iter().any(|f| f.field == "circuitBreakerThreshold"));
    }
}
