//! Structural validation for nodes and relationships before they reach the
//! backend. Returns a list of findings rather than throwing on the first
//! problem, so a caller can report every defect in one round trip.

use codeindex_domain::entities::{CodeNode, CodeRelationship, RelationshipType};

/// One structural defect found in a node or relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub field: String,
    pub message: String,
}

impl ValidationFinding {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a [`CodeNode`], returning every structural defect found.
#[must_use]
pub fn validate_node(node: &CodeNode) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    if node.id.is_empty() {
        findings.push(ValidationFinding::new("id", "must not be empty"));
    }
    if node.name.is_empty() {
        findings.push(ValidationFinding::new("name", "must not be empty"));
    }
    if node.file_path.is_empty() {
        findings.push(ValidationFinding::new("file_path", "must not be empty"));
    }
    if node.start_line > node.end_line {
        findings.push(ValidationFinding::new(
            "start_line",
            format!(
                "start_line ({}) must not exceed end_line ({})",
                node.start_line, node.end_line
            ),
        ));
    }
    findings
}

/// Validate a [`CodeRelationship`], including relationship-type-specific
/// structural checks on its metadata.
#[must_use]
pub fn validate_relationship(relationship: &CodeRelationship) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    if relationship.from_id.is_empty() {
        findings.push(ValidationFinding::new("from_id", "must not be empty"));
    }
    if relationship.to_id.is_empty() {
        findings.push(ValidationFinding::new("to_id", "must not be empty"));
    }

    let metadata = &relationship.metadata;
    match relationship.rel_type {
        RelationshipType::Imports => {
            if metadata.source.as_deref().unwrap_or("").is_empty() {
                findings.push(ValidationFinding::new(
                    "metadata.source",
                    "IMPORTS relationship requires a non-empty source",
                ));
            }
        }
        RelationshipType::Tests | RelationshipType::TestedBy => {
            if let Some(confidence) = metadata.confidence {
                if !(0.0..=1.0).contains(&confidence) {
                    findings.push(ValidationFinding::new(
                        "metadata.confidence",
                        "TESTS confidence must be within [0, 1]",
                    ));
                }
            }
        }
        RelationshipType::HasType | RelationshipType::AcceptsType | RelationshipType::ReturnsType => {
            if metadata.type_string.as_deref().unwrap_or("").is_empty() {
                findings.push(ValidationFinding::new(
                    "metadata.type_string",
                    "type relationship requires a non-empty type_string",
                ));
            }
        }
        RelationshipType::Extends => {
            if metadata.parent_class.as_deref().unwrap_or("").is_empty() {
                findings.push(ValidationFinding::new(
                    "metadata.parent_class",
                    "EXTENDS relationship requires a non-empty parent_class",
                ));
            }
        }
        RelationshipType::Implements => {
            if metadata.interface.as_deref().unwrap_or("").is_empty() {
                findings.push(ValidationFinding::new(
                    "metadata.interface",
                    "IMPLEMENTS relationship requires a non-empty interface",
                ));
            }
        }
        _ => {}
    }

    findings
}

/// Tracks per-validator-class failure counts, used by the graph service to
/// surface "N nodes rejected by validation" style counters without aborting a
/// batch on the first bad record.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationFailureCounters {
    pub node_failures: u64,
    pub relationship_failures: u64,
    pub metadata_failures: u64,
}

impl ValidationFailureCounters {
    pub fn record_node(&mut self, findings: &[ValidationFinding]) {
        if !findings.is_empty() {
            self.node_failures += 1;
        }
    }

    pub fn record_relationship(&mut self, findings: &[ValidationFinding]) {
        if !findings.is_empty() {
            self.relationship_failures += 1;
        }
    }

    /// Count a relationship whose metadata failed sanitization (rejected
    /// before it ever became a [`ValidationFinding`] list).
    pub fn record_metadata_failure(&mut self) {
        self.metadata_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeindex_domain::entities::{NodeType, RelationshipMetadata};

    fn sample_node() -> CodeNode {
        CodeNode {
            id: "n1".to_owned(),
            node_type: NodeType::Function,
            name: "do_thing".to_owned(),
            file_path: "src/a.rs".to_owned(),
            start_line: 1,
            end_line: 10,
            language: Some("rust".to_owned()),
        }
    }

    fn sample_relationship(rel_type: RelationshipType, metadata: RelationshipMetadata) -> CodeRelationship {
        CodeRelationship {
            from_id: "n1".to_owned(),
            to_id: "n2".to_owned(),
            rel_type,
            metadata,
        }
    }

    #[test]
    fn well_formed_node_has_no_findings() {
        assert!(validate_node(&sample_node()).is_empty());
    }

    #[test]
    fn node_with_inverted_line_range_is_flagged() {
        let mut node = sample_node();
        node.start_line = 10;
        node.end_line = 2;
        let findings = validate_node(&node);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "start_line");
    }

    #[test]
    fn imports_without_source_is_flagged() {
        let relationship = sample_relationship(RelationshipType::Imports, RelationshipMetadata::default());
        let findings = validate_relationship(&relationship);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "metadata.source");
    }

    #[test]
    fn tests_confidence_out_of_range_is_flagged() {
        let metadata = RelationshipMetadata {
            confidence: Some(1.5),
            ..Default::default()
        };
        let relationship = sample_relationship(RelationshipType::Tests, metadata);
        let findings = validate_relationship(&relationship);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "metadata.confidence");
    }

    #[test]
    fn extends_without_parent_class_is_flagged() {
        let relationship = sample_relationship(RelationshipType::Extends, RelationshipMetadata::default());
        let findings = validate_relationship(&relationship);
        assert_eq!(findings[0].field, "metadata.parent_class");
    }

    #[test]
    fn unrelated_relationship_types_have_no_extra_checks() {
        let relationship = sample_relationship(RelationshipType::Calls, RelationshipMetadata::default());
        assert!(validate_relationship(&relationship).is_empty());
    }

    #[test]
    fn failure_counters_only_increment_on_nonempty_findings() {
        let mut counters = ValidationFailureCounters::default();
        counters.record_node(&[]);
        counters.record_node(&[ValidationFinding::new("id", "bad")]);
        assert_eq!(counters.node_failures, 1);
    }

    #[test]
    fn metadata_failures_are_tracked_independently() {
        let mut counters = ValidationFailureCounters::default();
        counters.record_metadata_failure();
        counters.record_metadata_failure();
        assert_eq!(counters.metadata_failures, 2);
        assert_eq!(counters.node_failures, 0);
        assert_eq!(counters.relationship_failures, 0);
    }
}
