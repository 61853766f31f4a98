//! Versioned trust-safety thresholds and their evaluation records.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::governance::{EvolutionFlags, GovernanceSnapshot};
use super::risk::{RiskConfidence, RiskDimension};

/// Comparison applied between a metric value and a threshold value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    /// `value > threshold`
    Gt,
    /// `value >= threshold`
    Gte,
    /// `value < threshold`
    Lt,
    /// `value <= threshold`
    Lte,
}

impl Comparator {
    /// Evaluate `value <op> threshold`.
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Gte => value >= threshold,
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
        }
    }

    /// Operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Class of intervention a threshold would justify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionClass {
    /// Keep watching.
    Observe,
    /// Tell a human.
    Notify,
    /// Slow traffic down.
    Throttle,
    /// Stop traffic.
    Pause,
    /// Open an investigation.
    Investigate,
}

impl fmt::Display for InterventionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observe => write!(f, "observe"),
            Self::Notify => write!(f, "notify"),
            Self::Throttle => write!(f, "throttle"),
            Self::Pause => write!(f, "pause"),
            Self::Investigate => write!(f, "investigate"),
        }
    }
}

/// Versioned threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustSafetyThreshold {
    /// Rule ID.
    pub id: String,
    /// Domain the rule applies to.
    pub domain: String,
    /// Dimension compared.
    pub dimension: RiskDimension,
    /// Comparison operator.
    pub comparator: Comparator,
    /// Threshold value.
    pub value: f64,
    /// Contract version the rule was written against.
    pub contract_version: String,
    /// Short human label.
    pub label: String,
    /// Intervention the rule would justify.
    pub intervention_class: InterventionClass,
    /// Whether the rule itself is retired.
    #[serde(default)]
    pub deprecated: bool,
    /// Evolution flags the rule was written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<EvolutionFlags>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TrustSafetyThreshold {
    /// Create a threshold rule.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        dimension: RiskDimension,
        comparator: Comparator,
        value: f64,
        contract_version: impl Into<String>,
        label: impl Into<String>,
        intervention_class: InterventionClass,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            dimension,
            comparator,
            value,
            contract_version: contract_version.into(),
            label: label.into(),
            intervention_class,
            deprecated: false,
            evolution: None,
            description: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the rule as deprecated.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// `domain@contract_version` reference.
    pub fn contract_ref(&self) -> String {
        format!("{}@{}", self.domain, self.contract_version)
    }
}

/// Outcome of comparing one snapshot against one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCrossing {
    /// Rule evaluated.
    pub threshold_id: String,
    /// Snapshot evaluated.
    pub snapshot_id: String,
    /// Frame behind the snapshot.
    pub frame_id: String,
    /// Domain.
    pub domain: String,
    /// Dimension compared.
    pub dimension: RiskDimension,
    /// Operator used.
    pub comparator: Comparator,
    /// Threshold value.
    pub threshold_value: f64,
    /// Observed metric value (0 if the metric was missing).
    pub value: f64,
    /// Whether the comparison held.
    pub crossed: bool,
    /// Snapshot wall-clock time.
    pub timestamp: i64,
    /// Snapshot logical time.
    pub logical_time: u64,
    /// Snapshot governance.
    pub governance: GovernanceSnapshot,
    /// Snapshot confidence.
    pub confidence: RiskConfidence,
}

/// Decision attached to a justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionDecision {
    /// Governance allows the intervention.
    Justified,
    /// Governance refuses the intervention.
    Blocked,
    /// Reserved. No evaluator path produces it.
    Deferred,
}

/// Structured explanation for a first threshold crossing. Never an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionJustification {
    /// Justification ID (`<threshold id>:<snapshot id>`).
    pub id: String,
    /// Rule crossed.
    pub threshold_id: String,
    /// Snapshot of the first crossing.
    pub snapshot_id: String,
    /// Frame of the first crossing.
    pub frame_id: String,
    /// Domain.
    pub domain: String,
    /// Dimension crossed.
    pub dimension: RiskDimension,
    /// Justified or blocked.
    pub decision: InterventionDecision,
    /// Cites the crossing comparison.
    pub why_now: String,
    /// Cites the previous value for the same domain and dimension.
    pub why_not_earlier: String,
    /// Cites the rule label, class and description.
    pub why_this_intervention: String,
    /// Intervention the rule names.
    pub intervention_class: InterventionClass,
    /// Governance at the crossing.
    pub governance: GovernanceSnapshot,
    /// Snapshot confidence.
    pub confidence: RiskConfidence,
    /// Snapshot signals.
    pub signals: Vec<String>,
    /// Caveats, including any blocking reasons.
    pub assumptions: Vec<String>,
    /// Contract references consulted.
    pub contracts_referenced: Vec<String>,
    /// Crossing wall-clock time.
    pub timestamp: i64,
    /// Crossing logical time.
    pub logical_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparators() {
        assert!(Comparator::Gt.evaluate(0.6, 0.5));
        assert!(!Comparator::Gt.evaluate(0.5, 0.5));
        assert!(Comparator::Gte.evaluate(0.5, 0.5));
        assert!(Comparator::Lt.evaluate(0.4, 0.5));
        assert!(!Comparator::Lt.evaluate(0.5, 0.5));
        assert!(Comparator::Lte.evaluate(0.5, 0.5));
    }

    #[test]
    fn test_threshold_deserializes_with_defaults() {
        let json = serde_json::json!({
            "id": "noshow-spike",
            "domain": "booking",
            "dimension": "noShowHazard",
            "comparator": "gte",
            "value": 0.6,
            "contractVersion": "1.0.0",
            "label": "No-show spike",
            "interventionClass": "throttle"
        });

        let threshold: TrustSafetyThreshold = serde_json::from_value(json).unwrap();
        assert_eq!(threshold.dimension, RiskDimension::NoShowHazard);
        assert_eq!(threshold.comparator, Comparator::Gte);
        assert_eq!(threshold.intervention_class, InterventionClass::Throttle);
        assert!(!threshold.deprecated);
        assert_eq!(threshold.contract_ref(), "booking@1.0.0");
    }
}
