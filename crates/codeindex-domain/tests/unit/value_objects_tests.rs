use codeindex_domain::value_objects::{vector_point_id, SubsystemStatus, SystemHealth};
use proptest::prelude::*;

#[test]
fn health_is_healthy_iff_neither_side_is_error() {
    assert_eq!(
        SystemHealth::from_statuses(SubsystemStatus::Idle, SubsystemStatus::Indexed),
        SystemHealth::Healthy
    );
}

#[test]
fn health_is_failed_iff_both_sides_are_error() {
    assert_eq!(
        SystemHealth::from_statuses(SubsystemStatus::Error, SubsystemStatus::ConnectionFailed),
        SystemHealth::Failed
    );
}

#[test]
fn health_is_degraded_otherwise() {
    assert_eq!(
        SystemHealth::from_statuses(SubsystemStatus::Error, SubsystemStatus::Indexed),
        SystemHealth::Degraded
    );
    assert_eq!(
        SystemHealth::from_statuses(SubsystemStatus::Idle, SubsystemStatus::Error),
        SystemHealth::Degraded
    );
}

proptest! {
    /// P1 — Deterministic ids: two runs over identical content produce identical
    /// point ids, and distinct content (almost always) produces distinct ids.
    #[test]
    fn p1_vector_point_id_is_deterministic(hash in "[a-f0-9]{8,64}") {
        let a = vector_point_id(&hash);
        let b = vector_point_id(&hash);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn p10_system_health_totality(
        vector_error in any::<bool>(),
        graph_error in any::<bool>(),
    ) {
        let vector = if vector_error { SubsystemStatus::Error } else { SubsystemStatus::Indexed };
        let graph = if graph_error { SubsystemStatus::Error } else { SubsystemStatus::Indexed };
        let health = SystemHealth::from_statuses(vector, graph);
        match (vector_error, graph_error) {
            (false, false) => prop_assert_eq!(health, SystemHealth::Healthy),
            (true, true) => prop_assert_eq!(health, SystemHealth::Failed),
            _ => prop_assert_eq!(health, SystemHealth::Degraded),
        }
    }
}
