//! Relationship metadata sanitizer.
//!
//! Normalizes an arbitrary JSON value purporting to describe a relationship into a
//! flat mapping of primitives/primitive arrays, safe for property-graph storage.

use std::collections::HashSet;

use codeindex_domain::error::{Error, Result};
use serde_json::{Map, Value};

/// Tunable limits for sanitization. Defaults match the `maxMetadata*` config
/// surface in [`crate::config`].
#[derive(Debug, Clone)]
pub struct SanitizerLimits {
    pub max_size_bytes: usize,
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub max_object_depth: usize,
    pub allow_truncation: bool,
}

impl Default for SanitizerLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: codeindex_domain::constants::DEFAULT_MAX_METADATA_SIZE_BYTES,
            max_string_length: codeindex_domain::constants::DEFAULT_MAX_METADATA_STRING_LENGTH,
            max_array_length: codeindex_domain::constants::DEFAULT_MAX_METADATA_ARRAY_LENGTH,
            max_object_depth: codeindex_domain::constants::DEFAULT_MAX_METADATA_OBJECT_DEPTH,
            allow_truncation: true,
        }
    }
}

/// Result of a successful sanitization pass.
#[derive(Debug, Clone)]
pub struct SanitizedMetadata {
    pub value: Map<String, Value>,
    pub warnings: Vec<String>,
    pub truncated: bool,
}

/// Sanitize an arbitrary JSON value into a flat, graph-storable mapping.
///
/// # Errors
/// Returns [`Error::MetadataValidation`] on a detected cycle or, when truncation is
/// disallowed, on a size-limit overflow. The sanitizer never errors on an oversized
/// *leaf* value — those are truncated in place (rule 4).
pub fn sanitize(input: &Value, limits: &SanitizerLimits) -> Result<SanitizedMetadata> {
    let mut warnings = Vec::new();

    // Rule 1: non-object inputs are wrapped.
    let object = match input {
        Value::Object(map) => map.clone(),
        Value::Null => {
            warnings.push("Dropped null top-level value".to_owned());
            Map::new()
        }
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_owned(), other.clone());
            wrapped
        }
    };

    let mut out = Map::new();
    let mut visiting: HashSet<usize> = HashSet::new();
    for (key, value) in &object {
        match sanitize_value(value, limits, 0, "root", key, &mut visiting, &mut warnings)? {
            Some(sanitized) => {
                out.insert(key.clone(), sanitized);
            }
            None => {
                warnings.push(format!(
                    "Dropped unsupported value for key '{key}' (null/undefined/function/symbol)"
                ));
            }
        }
    }

    // Rule 6: size enforcement on the whole object, truncate by increasing
    // insertion order if allowed.
    let mut truncated = false;
    let serialized = serde_json::to_vec(&out).unwrap_or_default();
    if serialized.len() > limits.max_size_bytes {
        if limits.allow_truncation {
            let keys: Vec<String> = out.keys().cloned().collect();
            let mut remaining = Vec::new();
            for key in keys {
                out.shift_remove(&key);
                remaining.push(key);
                let probe = serde_json::to_vec(&out).unwrap_or_default();
                if probe.len() <= limits.max_size_bytes {
                    break;
                }
            }
            out.insert("__truncated".to_owned(), Value::Bool(true));
            out.insert(
                "__remainingProperties".to_owned(),
                Value::Array(remaining.into_iter().map(Value::String).collect()),
            );
            truncated = true;
            warnings.push(
                "Aggressive truncation was applied to fit the metadata size limit".to_owned(),
            );
        } else {
            return Err(Error::MetadataValidation {
                operation: "sanitize".to_owned(),
                message: "SIZE_LIMIT_EXCEEDED".to_owned(),
            });
        }
    }

    Ok(SanitizedMetadata {
        value: out,
        warnings,
        truncated,
    })
}

/// Sanitize a single value. Returns `Ok(None)` for values that should be dropped
/// entirely (rule 1). `path_id` identifies the *containing object* on the current
/// recursion stack for cycle detection; we key on pointer identity via the JSON
/// value's address, approximated here by tracking `(depth, key)` pairs is
/// insufficient for real cycles, so instead we track the `Map`/`Array` pointer
/// address via `std::ptr`.
fn sanitize_value(
    value: &Value,
    limits: &SanitizerLimits,
    depth: usize,
    path_prefix: &str,
    key: &str,
    visiting: &mut HashSet<usize>,
    warnings: &mut Vec<String>,
) -> Result<Option<Value>> {
    let path = format!("{path_prefix}.{key}");

    match value {
        Value::Null => Ok(None),
        Value::Bool(_) | Value::Number(_) => Ok(Some(value.clone())),
        Value::String(s) => Ok(Some(truncate_string(s, limits, &path, warnings))),
        Value::Array(items) => {
            let ptr = items.as_ptr() as usize;
            if !visiting.insert(ptr) {
                return Err(cycle_error(&path));
            }
            let mut out = Vec::new();
            for (idx, item) in items.iter().enumerate() {
                if out.len() >= limits.max_array_length {
                    out.push(Value::String(format!(
                        "…({} more)",
                        items.len() - limits.max_array_length
                    )));
                    break;
                }
                let item_key = format!("[{idx}]");
                if let Some(sanitized) = sanitize_value(
                    item,
                    limits,
                    depth,
                    &path,
                    &item_key,
                    visiting,
                    warnings,
                )? {
                    out.push(sanitized);
                }
            }
            visiting.remove(&ptr);
            Ok(Some(Value::Array(out)))
        }
        Value::Object(map) => {
            let ptr = map as *const _ as usize;
            if !visiting.insert(ptr) {
                return Err(cycle_error(&path));
            }
            if depth >= limits.max_object_depth {
                visiting.remove(&ptr);
                let stringified = serde_json::to_string(value).unwrap_or_default();
                let mut wrapper = Map::new();
                wrapper.insert("__stringified".to_owned(), Value::Bool(true));
                wrapper.insert("__originalType".to_owned(), Value::String("Object".to_owned()));
                wrapper.insert("value".to_owned(), Value::String(stringified));
                return Ok(Some(Value::Object(wrapper)));
            }
            let mut out = Map::new();
            for (child_key, child_value) in map {
                if let Some(sanitized) = sanitize_value(
                    child_value,
                    limits,
                    depth + 1,
                    &path,
                    child_key,
                    visiting,
                    warnings,
                )? {
                    out.insert(child_key.clone(), sanitized);
                }
            }
            visiting.remove(&ptr);
            Ok(Some(Value::Object(out)))
        }
    }
}

fn truncate_string(s: &str, limits: &SanitizerLimits, path: &str, warnings: &mut Vec<String>) -> Value {
    if s.chars().count() <= limits.max_string_length {
        return Value::String(s.to_owned());
    }
    let truncated: String = s.chars().take(limits.max_string_length).collect();
    warnings.push(format!(
        "Truncated string at '{path}' from {} to {} characters",
        s.chars().count(),
        limits.max_string_length
    ));
    Value::String(format!("{truncated}…"))
}

fn cycle_error(path: &str) -> Error {
    Error::MetadataValidation {
        operation: "sanitize".to_owned(),
        message: format!("Circular reference detected at path: {path}"),
    }
}

/// Encode a `chrono::DateTime` as `{__type: "Date", value: ISO8601-string}`.
#[must_use]
pub fn encode_date(value: &chrono::DateTime<chrono::Utc>) -> Value {
    let mut map = Map::new();
    map.insert("__type".to_owned(), Value::String("Date".to_owned()));
    map.insert("value".to_owned(), Value::String(value.to_rfc3339()));
    Value::Object(map)
}

/// Encode an arbitrary-precision integer as `{__type: "BigInt", value: decimal-string}`.
#[must_use]
pub fn encode_big_int(decimal: &str) -> Value {
    let mut map = Map::new();
    map.insert("__type".to_owned(), Value::String("BigInt".to_owned()));
    map.insert("value".to_owned(), Value::String(decimal.to_owned()));
    Value::Object(map)
}
