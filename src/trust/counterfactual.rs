//! Counterfactual comparison of two replayed timelines.
//!
//! Answers "what changed between the baseline and this variant?" as signed
//! deltas plus coarse direction signals. Both sides are summarized from their
//! own timeline and trajectory; nothing is re-executed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::audit::stats::{self, ANOMALY_DETECTED, BOOKING_CANCELLED};
use crate::types::{AuditTimeline, EvolutionFlags, RiskTrajectory};

const REPLAY_ONLY_ASSUMPTION: &str =
    "Comparison is replay-only; no side effects were produced by either run.";
const ATTRIBUTION_ASSUMPTION: &str =
    "Differences are attributed to envelope content only, never to hidden runtime state.";
const NO_DIVERGENCE_NOTE: &str = "No governance divergence between baseline and variant.";

/// One side of a counterfactual comparison.
#[derive(Debug, Clone, Copy)]
pub struct CounterfactualInput<'a> {
    /// Timeline replayed.
    pub timeline: &'a AuditTimeline,
    /// Trajectory built from that timeline.
    pub trajectory: &'a RiskTrajectory,
    /// Optional human label.
    pub label: Option<&'a str>,
}

impl<'a> CounterfactualInput<'a> {
    /// Create an unlabeled input.
    pub fn new(timeline: &'a AuditTimeline, trajectory: &'a RiskTrajectory) -> Self {
        Self {
            timeline,
            trajectory,
            label: None,
        }
    }

    /// Attach a label.
    pub fn labeled(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }
}

/// Summary of one side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterfactualObservation {
    /// Timeline ID.
    pub timeline_id: String,
    /// Trajectory ID.
    pub trajectory_id: String,
    /// Human label, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Mean composite risk over the snapshots (0 when there are none).
    pub mean_risk: f64,
    /// `booking.cancelled` count.
    pub cancellations: i64,
    /// `anomaly.detected` count.
    pub anomalies: i64,
    /// p95 latency, if any frame carries a sample.
    pub latency_p95_ms: Option<f64>,
    /// Fraction of synthetic frames, `None` for an empty timeline.
    pub synthetic_share: Option<f64>,
    /// First-seen evolution flags per domain.
    pub evolution: BTreeMap<String, EvolutionFlags>,
}

impl CounterfactualObservation {
    /// Summarize one side.
    pub fn observe(input: &CounterfactualInput<'_>) -> Self {
        let timeline = input.timeline;
        let trajectory = input.trajectory;

        let mean_risk = if trajectory.snapshots.is_empty() {
            0.0
        } else {
            trajectory
                .snapshots
                .iter()
                .map(|s| s.composite_risk())
                .sum::<f64>()
                / trajectory.snapshots.len() as f64
        };

        let synthetic_share = (!timeline.is_empty())
            .then(|| timeline.sources().synthetic as f64 / timeline.len() as f64);

        Self {
            timeline_id: timeline.id().to_string(),
            trajectory_id: trajectory.id.clone(),
            label: input.label.map(str::to_string),
            mean_risk,
            cancellations: stats::count_events(timeline, BOOKING_CANCELLED),
            anomalies: stats::count_events(timeline, ANOMALY_DETECTED),
            latency_p95_ms: stats::latency_p95(timeline),
            synthetic_share,
            evolution: timeline.evolution_flags().clone(),
        }
    }
}

/// Signed `variant - baseline` differences.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterfactualDelta {
    /// Mean risk difference.
    pub risk: f64,
    /// Cancellation count difference.
    pub cancellations: i64,
    /// Anomaly count difference.
    pub anomalies: i64,
    /// p95 latency difference; `None` if either side lacks samples.
    pub latency_p95_ms: Option<f64>,
    /// Synthetic share difference; `None` if either side is empty.
    pub synthetic_share: Option<f64>,
}

/// Direction signal derived from a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterfactualSignal {
    /// Mean risk increased.
    RiskWorse,
    /// Mean risk decreased.
    RiskImproved,
    /// Mean risk unchanged.
    RiskStable,
    /// More cancellations.
    CancellationsUp,
    /// Fewer cancellations.
    CancellationsDown,
    /// Same cancellations.
    CancellationsStable,
    /// More anomalies.
    AnomaliesUp,
    /// Fewer anomalies.
    AnomaliesDown,
    /// Same anomalies.
    AnomaliesStable,
}

impl CounterfactualSignal {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskWorse => "RISK_WORSE",
            Self::RiskImproved => "RISK_IMPROVED",
            Self::RiskStable => "RISK_STABLE",
            Self::CancellationsUp => "CANCELLATIONS_UP",
            Self::CancellationsDown => "CANCELLATIONS_DOWN",
            Self::CancellationsStable => "CANCELLATIONS_STABLE",
            Self::AnomaliesUp => "ANOMALIES_UP",
            Self::AnomaliesDown => "ANOMALIES_DOWN",
            Self::AnomaliesStable => "ANOMALIES_STABLE",
        }
    }

    /// Classify a delta. Any non-zero change counts as a direction.
    pub fn classify(delta: &CounterfactualDelta) -> [Self; 3] {
        let risk = if delta.risk > 0.0 {
            Self::RiskWorse
        } else if delta.risk < 0.0 {
            Self::RiskImproved
        } else {
            Self::RiskStable
        };
        let cancellations = match delta.cancellations.signum() {
            1 => Self::CancellationsUp,
            -1 => Self::CancellationsDown,
            _ => Self::CancellationsStable,
        };
        let anomalies = match delta.anomalies.signum() {
            1 => Self::AnomaliesUp,
            -1 => Self::AnomaliesDown,
            _ => Self::AnomaliesStable,
        };
        [risk, cancellations, anomalies]
    }
}

impl std::fmt::Display for CounterfactualSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a counterfactual comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionCounterfactual {
    /// Baseline summary.
    pub baseline: CounterfactualObservation,
    /// Variant summary.
    pub variant: CounterfactualObservation,
    /// `variant - baseline`.
    pub delta: CounterfactualDelta,
    /// Risk, cancellation and anomaly directions.
    pub signals: Vec<CounterfactualSignal>,
    /// Caveats, including the side labels.
    pub assumptions: Vec<String>,
    /// Governance differences between the sides.
    pub governance_notes: Vec<String>,
    /// Always true: both sides come from built timelines.
    pub replay_compatible: bool,
}

/// Compare a variant against a baseline.
pub fn analyze_counterfactual(
    baseline: CounterfactualInput<'_>,
    variant: CounterfactualInput<'_>,
) -> InterventionCounterfactual {
    let base = CounterfactualObservation::observe(&baseline);
    let var = CounterfactualObservation::observe(&variant);

    let delta = CounterfactualDelta {
        risk: var.mean_risk - base.mean_risk,
        cancellations: var.cancellations - base.cancellations,
        anomalies: var.anomalies - base.anomalies,
        latency_p95_ms: option_delta(base.latency_p95_ms, var.latency_p95_ms),
        synthetic_share: option_delta(base.synthetic_share, var.synthetic_share),
    };

    let mut assumptions = vec![
        REPLAY_ONLY_ASSUMPTION.to_string(),
        ATTRIBUTION_ASSUMPTION.to_string(),
    ];
    if let Some(label) = baseline.label {
        assumptions.push(format!("Baseline: {label}"));
    }
    if let Some(label) = variant.label {
        assumptions.push(format!("Variant: {label}"));
    }

    let governance_notes = governance_notes(&baseline, &variant);
    let signals = CounterfactualSignal::classify(&delta).to_vec();

    tracing::debug!(
        baseline_id = %base.timeline_id,
        variant_id = %var.timeline_id,
        risk_delta = delta.risk,
        signals = ?signals,
        "counterfactual analyzed"
    );

    InterventionCounterfactual {
        baseline: base,
        variant: var,
        delta,
        signals,
        assumptions,
        governance_notes,
        replay_compatible: true,
    }
}

fn option_delta(baseline: Option<f64>, variant: Option<f64>) -> Option<f64> {
    match (baseline, variant) {
        (Some(b), Some(v)) => Some(v - b),
        _ => None,
    }
}

fn governance_notes(baseline: &CounterfactualInput<'_>, variant: &CounterfactualInput<'_>) -> Vec<String> {
    let mut notes = Vec::new();

    let base_flags = baseline.timeline.evolution_flags();
    let var_flags = variant.timeline.evolution_flags();
    let domains: BTreeSet<&String> = base_flags.keys().chain(var_flags.keys()).collect();
    for domain in domains {
        if base_flags.get(domain) != var_flags.get(domain) {
            notes.push(format!(
                "Evolution flags for {domain} differ: baseline {}, variant {}",
                describe_flags(base_flags.get(domain)),
                describe_flags(var_flags.get(domain))
            ));
        }
    }

    for (side, input) in [("baseline", baseline), ("variant", variant)] {
        for frame in input.timeline.frames().iter().filter(|f| !f.governance.permitted) {
            notes.push(format!(
                "Frame {} in {side} is not permitted for domain {}: {}",
                frame.id,
                frame.domain(),
                frame.governance.reason.as_deref().unwrap_or("no reason recorded")
            ));
        }
    }

    if notes.is_empty() {
        notes.push(NO_DIVERGENCE_NOTE.to_string());
    }
    notes
}

fn describe_flags(flags: Option<&EvolutionFlags>) -> String {
    match flags {
        None => "none".to_string(),
        Some(flags) => format!(
            "allowBreakingChanges={}, requireMigrationPlan={}, versionUpgradeRequired={}",
            flags.allow_breaking_changes,
            flags.require_migration_plan,
            flags.version_upgrade_required.as_deref().unwrap_or("none")
        ),
    }
}
