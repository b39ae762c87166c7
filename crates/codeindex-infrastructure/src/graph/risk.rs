//! Blast-radius risk scoring and change-safety assessment.

/// The raw counts a risk score is computed from. `dependency_count` and
/// `target_found` are carried through for reporting but do not enter
/// [`risk_score`] itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactCounts {
    pub impacted_nodes: u32,
    pub impacted_files: u32,
    pub max_depth: u32,
    pub test_count: u32,
    pub dependency_count: u32,
    pub target_found: bool,
}

/// Qualitative bucket for a risk score in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Safe,
    Moderate,
    Risky,
    Dangerous,
}

impl SafetyLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Moderate => "moderate",
            SafetyLevel::Risky => "risky",
            SafetyLevel::Dangerous => "dangerous",
        }
    }
}

/// Score `counts` on a 0-100 scale: weighted, capped contributions from
/// impacted-node count, impacted-file count, and traversal depth, offset by a
/// test-coverage bonus/penalty (no covering tests adds a flat penalty; each
/// covering test subtracts, capped).
#[must_use]
pub fn risk_score(counts: ImpactCounts) -> u32 {
    let node_component = (10 * counts.impacted_nodes).min(30);
    let file_component = (20 * counts.impacted_files).min(40);
    let depth_component = (15 * counts.max_depth).min(30);
    let test_component: i64 = if counts.test_count == 0 {
        50
    } else {
        -((5 * counts.test_count).min(25) as i64)
    };

    let total = node_component as i64 + file_component as i64 + depth_component as i64 + test_component;
    total.clamp(0, 100) as u32
}

/// Classify a risk score into a qualitative safety level.
#[must_use]
pub fn safety_level(score: u32) -> SafetyLevel {
    if score < 20 {
        SafetyLevel::Safe
    } else if score < 40 {
        SafetyLevel::Moderate
    } else if score < 70 {
        SafetyLevel::Risky
    } else {
        SafetyLevel::Dangerous
    }
}

/// The full change-safety verdict: the score, its bucket, and human-readable
/// reasons/recommendations driven by the metrics behind the score.
#[derive(Debug, Clone)]
pub struct ChangeSafetyAssessment {
    pub score: u32,
    pub level: SafetyLevel,
    pub counts: ImpactCounts,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Build the human-readable reason list behind a score: one line per
/// dimension that contributed, skipping dimensions with nothing to report.
#[must_use]
fn reasons_for(counts: ImpactCounts) -> Vec<String> {
    let mut reasons = Vec::new();
    if counts.impacted_nodes > 0 {
        reasons.push(format!("{} node(s) transitively impacted", counts.impacted_nodes));
    }
    if counts.impacted_files > 0 {
        reasons.push(format!("spans {} file(s)", counts.impacted_files));
    }
    if counts.max_depth > 0 {
        reasons.push(format!("impact reaches {} hop(s) deep", counts.max_depth));
    }
    if counts.dependency_count > 0 {
        reasons.push(format!("{} dependency node(s) in its dependency tree", counts.dependency_count));
    }
    if counts.test_count == 0 {
        reasons.push("no covering tests were found".to_owned());
    } else {
        reasons.push(format!("{} covering test(s) found", counts.test_count));
    }
    if !counts.target_found {
        reasons.push("target node could not be found in the graph".to_owned());
    }
    reasons
}

/// Build the recommendation list for `level`, tailored by which metrics drove
/// it there.
#[must_use]
fn recommendations_for(level: SafetyLevel, counts: ImpactCounts) -> Vec<String> {
    let mut recommendations = Vec::new();
    if counts.test_count == 0 {
        recommendations.push("Add test coverage before making this change".to_owned());
    }
    match level {
        SafetyLevel::Safe => {
            recommendations.push("Proceed; impact is limited".to_owned());
        }
        SafetyLevel::Moderate => {
            recommendations.push("Review impacted call sites before merging".to_owned());
        }
        SafetyLevel::Risky => {
            recommendations.push("Coordinate with owners of impacted files".to_owned());
            recommendations.push("Consider splitting this change into smaller steps".to_owned());
        }
        SafetyLevel::Dangerous => {
            recommendations.push("Get a second reviewer; impact is widespread".to_owned());
            recommendations.push("Stage the rollout behind a flag if possible".to_owned());
        }
    }
    recommendations
}

#[must_use]
pub fn assess_change_safety(counts: ImpactCounts) -> ChangeSafetyAssessment {
    let score = risk_score(counts);
    let level = safety_level(score);
    ChangeSafetyAssessment {
        score,
        level,
        counts,
        reasons: reasons_for(counts),
        recommendations: recommendations_for(level, counts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_impact_with_tests_is_the_lowest_score() {
        let counts = ImpactCounts {
            impacted_nodes: 0,
            impacted_files: 0,
            max_depth: 0,
            test_count: 10,
            ..Default::default()
        };
        assert_eq!(risk_score(counts), 0);
        assert_eq!(safety_level(0), SafetyLevel::Safe);
    }

    #[test]
    fn no_tests_adds_a_flat_fifty_point_penalty() {
        let counts = ImpactCounts {
            impacted_nodes: 0,
            impacted_files: 0,
            max_depth: 0,
            test_count: 0,
            ..Default::default()
        };
        assert_eq!(risk_score(counts), 50);
        assert_eq!(safety_level(50), SafetyLevel::Risky);
    }

    #[test]
    fn per_dimension_contributions_are_capped() {
        let counts = ImpactCounts {
            impacted_nodes: 100,
            impacted_files: 100,
            max_depth: 100,
            test_count: 100,
            ..Default::default()
        };
        // 30 + 40 + 30 - 25 = 75, clamped at 100 regardless.
        assert_eq!(risk_score(counts), 75);
        assert_eq!(safety_level(75), SafetyLevel::Dangerous);
    }

    #[test]
    fn score_never_goes_negative() {
        let counts = ImpactCounts {
            impacted_nodes: 0,
            impacted_files: 0,
            max_depth: 0,
            test_count: 50,
            ..Default::default()
        };
        assert_eq!(risk_score(counts), 0);
    }

    #[test]
    fn no_tests_produces_a_coverage_reason_and_recommendation() {
        let assessment = assess_change_safety(ImpactCounts {
            impacted_nodes: 1,
            test_count: 0,
            ..Default::default()
        });
        assert!(assessment.reasons.iter().any(|r| r.contains("no covering tests")));
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("test coverage")));
    }

    #[test]
    fn dangerous_level_recommends_a_second_reviewer() {
        let assessment = assess_change_safety(ImpactCounts {
            impacted_nodes: 10,
            impacted_files: 10,
            max_depth: 10,
            test_count: 0,
            ..Default::default()
        });
        assert_eq!(assessment.level, SafetyLevel::Dangerous);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("second reviewer")));
    }

    #[test]
    fn safety_level_boundaries() {
        assert_eq!(safety_level(19), SafetyLevel::Safe);
        assert_eq!(safety_level(20), SafetyLevel::Moderate);
        assert_eq!(safety_level(39), SafetyLevel::Moderate);
        assert_eq!(safety_level(40), SafetyLevel::Risky);
        assert_eq!(safety_level(69), SafetyLevel::Risky);
        assert_eq!(safety_level(70), SafetyLevel::Dangerous);
    }
}
