//! Threshold evaluation and intervention justification.
//!
//! Every snapshot is compared against every threshold of its domain and the
//! outcome is recorded whether or not the threshold was crossed. A threshold
//! is justified at most once: on its first crossing. Later crossings are
//! logged but stay silent.
//!
//! ## Fail-Closed Gating
//!
//! A justification is `blocked` when any of these hold:
//! - no governance entry for the domain
//! - the domain is marked for deprecation
//! - the threshold's contract version differs from the registry's
//! - the threshold itself is deprecated
//!
//! `deferred` is never produced here.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    DomainRegistryEntry, GovernanceLookup, InterventionDecision, InterventionJustification,
    RiskDimension, RiskStateSnapshot, RiskTrajectory, ThresholdCrossing, TrustSafetyThreshold,
};

const DIAGNOSTIC_ASSUMPTION: &str =
    "Justification is diagnostic; no intervention is executed by the evaluator.";

/// Full audit log of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdEvaluation {
    /// One record per (snapshot, matching threshold), in snapshot order.
    pub crossings: Vec<ThresholdCrossing>,
    /// One justification per threshold that was ever crossed.
    pub justifications: Vec<InterventionJustification>,
}

impl ThresholdEvaluation {
    /// Crossings that held.
    pub fn crossed(&self) -> impl Iterator<Item = &ThresholdCrossing> {
        self.crossings.iter().filter(|c| c.crossed)
    }

    /// Justification for a threshold, if it was ever crossed.
    pub fn justification(&self, threshold_id: &str) -> Option<&InterventionJustification> {
        self.justifications
            .iter()
            .find(|j| j.threshold_id == threshold_id)
    }
}

/// Evaluate thresholds against a trajectory.
///
/// When `registry` is `None`, each snapshot's own governance entry is used.
pub fn evaluate_thresholds(
    trajectory: &RiskTrajectory,
    thresholds: &[TrustSafetyThreshold],
    registry: Option<&dyn GovernanceLookup>,
) -> ThresholdEvaluation {
    let mut evaluation = ThresholdEvaluation::default();
    let mut justified: BTreeSet<&str> = BTreeSet::new();
    let mut previous_values: BTreeMap<(&str, RiskDimension), f64> = BTreeMap::new();

    for snapshot in &trajectory.snapshots {
        for threshold in thresholds.iter().filter(|t| t.domain == snapshot.domain) {
            let value = snapshot.value(threshold.dimension);
            let crossed = threshold.comparator.evaluate(value, threshold.value);

            evaluation.crossings.push(ThresholdCrossing {
                threshold_id: threshold.id.clone(),
                snapshot_id: snapshot.id.clone(),
                frame_id: snapshot.frame_id.clone(),
                domain: snapshot.domain.clone(),
                dimension: threshold.dimension,
                comparator: threshold.comparator,
                threshold_value: threshold.value,
                value,
                crossed,
                timestamp: snapshot.timestamp,
                logical_time: snapshot.logical_time,
                governance: snapshot.governance.clone(),
                confidence: snapshot.confidence(),
            });

            if !crossed || !justified.insert(threshold.id.as_str()) {
                continue;
            }

            let previous = previous_values
                .get(&(snapshot.domain.as_str(), threshold.dimension))
                .copied();

            let entry = match registry {
                Some(registry) => registry.entry(&snapshot.domain),
                None => snapshot.governance.entry.as_ref(),
            };

            evaluation
                .justifications
                .push(justify(snapshot, threshold, entry, value, previous));
        }

        for dimension in RiskDimension::ALL {
            previous_values.insert(
                (snapshot.domain.as_str(), dimension),
                snapshot.value(dimension),
            );
        }
    }

    tracing::debug!(
        trajectory_id = %trajectory.id,
        thresholds = thresholds.len(),
        crossings = evaluation.crossings.len(),
        justifications = evaluation.justifications.len(),
        "thresholds evaluated"
    );

    evaluation
}

/// Reasons the intervention may not proceed.
fn blocking_reasons(
    domain: &str,
    threshold: &TrustSafetyThreshold,
    entry: Option<&DomainRegistryEntry>,
) -> Vec<String> {
    let mut reasons = Vec::new();
    match entry {
        None => reasons.push(format!("No governance entry for domain {domain}")),
        Some(entry) => {
            if entry.is_marked_for_deprecation() {
                reasons.push(format!("Domain {domain} is marked for deprecation"));
            }
            if entry.contract.version != threshold.contract_version {
                reasons.push(format!(
                    "Contract version mismatch: threshold {} targets {}, registry declares {}",
                    threshold.id, threshold.contract_version, entry.contract.version
                ));
            }
        }
    }
    if threshold.deprecated {
        reasons.push(format!("Threshold {} is deprecated", threshold.id));
    }
    reasons
}

fn justify(
    snapshot: &RiskStateSnapshot,
    threshold: &TrustSafetyThreshold,
    entry: Option<&DomainRegistryEntry>,
    value: f64,
    previous: Option<f64>,
) -> InterventionJustification {
    let reasons = blocking_reasons(&snapshot.domain, threshold, entry);
    let decision = if reasons.is_empty() {
        InterventionDecision::Justified
    } else {
        InterventionDecision::Blocked
    };

    if decision == InterventionDecision::Blocked {
        tracing::info!(
            threshold_id = %threshold.id,
            snapshot_id = %snapshot.id,
            domain = %snapshot.domain,
            reasons = ?reasons,
            "intervention blocked by governance"
        );
    }

    let why_now = format!(
        "{} reached {:.3} at frame {} (logical time {}), satisfying {} {} {:.3}",
        threshold.dimension,
        value,
        snapshot.frame_id,
        snapshot.logical_time,
        threshold.dimension,
        threshold.comparator,
        threshold.value
    );
    let why_not_earlier = match previous {
        Some(previous) => format!(
            "Previous {} for {} was {:.3}, which did not cross {} {:.3}",
            threshold.dimension, snapshot.domain, previous, threshold.comparator, threshold.value
        ),
        None => format!(
            "No earlier {} for {}; value stayed at {:.3}",
            threshold.dimension, snapshot.domain, value
        ),
    };
    let why_this_intervention = match &threshold.description {
        Some(description) => format!(
            "{} maps to a {} intervention: {}",
            threshold.label, threshold.intervention_class, description
        ),
        None => format!(
            "{} maps to a {} intervention",
            threshold.label, threshold.intervention_class
        ),
    };

    let mut contracts_referenced = vec![threshold.contract_ref()];
    if let Some(entry) = entry {
        let registry_ref = entry.contract_ref();
        if !contracts_referenced.contains(&registry_ref) {
            contracts_referenced.push(registry_ref);
        }
    }

    let mut assumptions = vec![DIAGNOSTIC_ASSUMPTION.to_string()];
    assumptions.extend(snapshot.assumptions.iter().cloned());
    assumptions.extend(reasons);

    InterventionJustification {
        id: format!("{}:{}", threshold.id, snapshot.id),
        threshold_id: threshold.id.clone(),
        snapshot_id: snapshot.id.clone(),
        frame_id: snapshot.frame_id.clone(),
        domain: snapshot.domain.clone(),
        dimension: threshold.dimension,
        decision,
        why_now,
        why_not_earlier,
        why_this_intervention,
        intervention_class: threshold.intervention_class,
        governance: snapshot.governance.clone(),
        confidence: snapshot.confidence(),
        signals: snapshot.signals.clone(),
        assumptions,
        contracts_referenced,
        timestamp: snapshot.timestamp,
        logical_time: snapshot.logical_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::timeline::{build_audit_timeline, TimelineOptions};
    use crate::trust::trajectory::build_risk_trajectory;
    use crate::types::{
        AnalyticsEnvelope, Comparator, DomainRegistry, InterventionClass,
    };

    const T0: i64 = 1_700_000_000_000;

    fn registry() -> DomainRegistry {
        DomainRegistry::from_entries([DomainRegistryEntry::new("booking", "1.0.0")])
    }

    fn cancellations(n: usize) -> RiskTrajectory {
        let envelopes: Vec<AnalyticsEnvelope> = (0..n)
            .map(|i| {
                AnalyticsEnvelope::new(format!("c{i}"), T0 + i as i64, i as u64, "core", "booking.cancelled")
            })
            .collect();
        let timeline =
            build_audit_timeline(&envelopes, &registry(), &TimelineOptions::with_id("tl")).unwrap();
        build_risk_trajectory(&timeline, None)
    }

    fn no_show_threshold(version: &str) -> TrustSafetyThreshold {
        TrustSafetyThreshold::new(
            "noshow-spike",
            "booking",
            RiskDimension::NoShowHazard,
            Comparator::Gte,
            0.5,
            version,
            "No-show spike",
            InterventionClass::Throttle,
        )
    }

    #[test]
    fn test_single_justification_on_first_crossing() {
        let trajectory = cancellations(4);
        let evaluation = evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], None);

        assert_eq!(evaluation.crossings.len(), 4);
        // 0.30, 0.55, 0.80, 1.0
        assert_eq!(evaluation.crossed().count(), 3);
        assert_eq!(evaluation.justifications.len(), 1);

        let justification = &evaluation.justifications[0];
        assert_eq!(justification.frame_id, "c1");
        assert_eq!(justification.decision, InterventionDecision::Justified);
        assert!(justification.why_not_earlier.contains("0.300"));
        assert_eq!(justification.contracts_referenced, vec!["booking@1.0.0"]);
    }

    #[test]
    fn test_contract_mismatch_blocks() {
        let trajectory = cancellations(3);
        let registry = registry();
        let evaluation =
            evaluate_thresholds(&trajectory, &[no_show_threshold("2.0.0")], Some(&registry));

        let justification = evaluation.justification("noshow-spike").unwrap();
        assert_eq!(justification.decision, InterventionDecision::Blocked);
        assert!(justification
            .assumptions
            .iter()
            .any(|a| a.contains("Contract version mismatch")));
        assert_eq!(
            justification.contracts_referenced,
            vec!["booking@2.0.0", "booking@1.0.0"]
        );
    }

    #[test]
    fn test_deprecated_threshold_blocks() {
        let trajectory = cancellations(3);
        let evaluation =
            evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0").deprecated()], None);
        assert_eq!(evaluation.justifications[0].decision, InterventionDecision::Blocked);
    }

    #[test]
    fn test_missing_entry_blocks() {
        let trajectory = cancellations(3);
        let empty = DomainRegistry::new();
        let evaluation =
            evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], Some(&empty));
        let justification = &evaluation.justifications[0];
        assert_eq!(justification.decision, InterventionDecision::Blocked);
        assert!(justification.assumptions.iter().any(|a| a.contains("No governance entry")));
    }

    #[test]
    fn test_other_domain_ignored() {
        let trajectory = cancellations(2);
        let mut threshold = no_show_threshold("1.0.0");
        threshold.domain = "provider".into();
        let evaluation = evaluate_thresholds(&trajectory, &[threshold], None);
        assert!(evaluation.crossings.is_empty());
        assert!(evaluation.justifications.is_empty());
    }

    #[test]
    fn test_first_snapshot_crossing_has_no_earlier_value() {
        let trajectory = cancellations(1);
        let mut threshold = no_show_threshold("1.0.0");
        threshold.value = 0.1;
        let evaluation = evaluate_thresholds(&trajectory, &[threshold], None);

        let why_not_earlier = &evaluation.justifications[0].why_not_earlier;
        assert_eq!(why_not_earlier, "No earlier noShowHazard for booking; value stayed at 0.300");
        assert!(!why_not_earlier.contains("did not cross"));
    }

    #[test]
    fn test_later_crossing_cites_previous_value() {
        let trajectory = cancellations(2);
        let evaluation = evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], None);

        let why_not_earlier = &evaluation.justifications[0].why_not_earlier;
        assert!(why_not_earlier.starts_with("Previous noShowHazard for booking was 0.300"));
        assert!(why_not_earlier.contains("did not cross >= 0.500"));
    }
}
