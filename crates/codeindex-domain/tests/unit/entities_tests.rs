use codeindex_domain::entities::{CodeNode, NodeType, RelationshipType};

#[test]
fn relationship_type_round_trips_through_its_wire_string() {
    for rel in RelationshipType::ALL {
        let wire = rel.as_str();
        assert_eq!(RelationshipType::parse(wire), Some(rel));
    }
}

#[test]
fn relationship_type_rejects_unknown_strings() {
    assert_eq!(RelationshipType::parse("DELETES"), None);
    assert_eq!(RelationshipType::parse(""), None);
}

#[test]
fn code_node_with_start_after_end_is_structurally_invalid() {
    let node = CodeNode {
        id: "n1".to_owned(),
        node_type: NodeType::Function,
        name: "add".to_owned(),
        file_path: "src/add.ts".to_owned(),
        start_line: 10,
        end_line: 5,
        language: None,
    };
    assert!(!node.is_structurally_valid());
}

#[test]
fn code_node_with_empty_id_is_structurally_invalid() {
    let node = CodeNode {
        id: String::new(),
        node_type: NodeType::Function,
        name: "add".to_owned(),
        file_path: "src/add.ts".to_owned(),
        start_line: 0,
        end_line: 1,
        language: None,
    };
    assert!(!node.is_structurally_valid());
}

#[test]
fn well_formed_code_node_is_valid() {
    let node = CodeNode {
        id: "n1".to_owned(),
        node_type: NodeType::Function,
        name: "add".to_owned(),
        file_path: "src/add.ts".to_owned(),
        start_line: 0,
        end_line: 0,
        language: Some("typescript".to_owned()),
    };
    assert!(node.is_structurally_valid());
}
