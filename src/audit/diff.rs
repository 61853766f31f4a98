//! Structural and metric comparison of two timelines.
//!
//! Both timelines are summarized independently; the diff never walks them in
//! lock-step, so timelines of different lengths or shapes compare cleanly.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::stats::{self, BOOKING_CANCELLED, BOOKING_CREATED};
use crate::types::{domain_of, AuditFrame, AuditTimeline, GovernanceSnapshot, SyntheticContext};

/// Kind of a diff explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplanationKind {
    /// An event type's count differs.
    MetricDivergence,
    /// A trust-safety signal appears on one side only.
    TrustSafetyChange,
    /// A frame appears on one side only.
    MissingFrame,
}

/// One human-readable difference with its governance context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffExplanation {
    /// What kind of difference.
    pub kind: ExplanationKind,
    /// Human-readable description.
    pub description: String,
    /// Domain concerned.
    pub domain: String,
    /// Governance of that domain.
    pub governance: GovernanceSnapshot,
    /// Frame concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    /// Simulation lineage of the frame concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthetic_context: Option<SyntheticContext>,
}

/// Service-level impact of the comparison relative to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SloImpacts {
    /// Difference of p95 latency; `None` when either side has no samples.
    pub latency_p95_delta: Option<f64>,
    /// Difference of `booking.created` counts.
    pub booking_delta: i64,
    /// Difference of `booking.cancelled` counts.
    pub cancellation_delta: i64,
}

/// Result of comparing two timelines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDiff {
    /// Baseline timeline ID.
    pub baseline_id: String,
    /// Comparison timeline ID.
    pub comparison_id: String,
    /// Baseline frame IDs absent from the comparison, in baseline order.
    pub missing_in_comparison: Vec<String>,
    /// Comparison frame IDs absent from the baseline, in comparison order.
    pub missing_in_baseline: Vec<String>,
    /// `comparison - baseline` per event type, over the union of types.
    pub metric_divergence: BTreeMap<String, i64>,
    /// Added/missing trust-safety signal descriptions.
    pub trust_safety_changes: Vec<String>,
    /// Latency and booking impacts.
    pub slo_impacts: SloImpacts,
    /// Explanations sorted by description.
    pub explanations: Vec<DiffExplanation>,
}

impl TimelineDiff {
    /// Whether the two timelines are indistinguishable to the diff.
    pub fn is_empty(&self) -> bool {
        self.missing_in_comparison.is_empty()
            && self.missing_in_baseline.is_empty()
            && self.trust_safety_changes.is_empty()
            && self.metric_divergence.values().all(|d| *d == 0)
    }
}

/// Per-timeline facts the diff compares.
struct Summary<'a> {
    ids: HashSet<&'a str>,
    counts: BTreeMap<String, i64>,
    signals: BTreeSet<&'a str>,
    latency_p95: Option<f64>,
}

impl<'a> Summary<'a> {
    fn of(timeline: &'a AuditTimeline) -> Self {
        Self {
            ids: timeline.frames().iter().map(|f| f.id.as_str()).collect(),
            counts: stats::event_counts(timeline),
            signals: timeline
                .frames()
                .iter()
                .flat_map(|f| f.signals().iter().map(String::as_str))
                .collect(),
            latency_p95: stats::latency_p95(timeline),
        }
    }

    fn count(&self, event_type: &str) -> i64 {
        self.counts.get(event_type).copied().unwrap_or(0)
    }
}

/// Compare `comparison` against `baseline`.
pub fn diff_timelines(baseline: &AuditTimeline, comparison: &AuditTimeline) -> TimelineDiff {
    let base = Summary::of(baseline);
    let comp = Summary::of(comparison);

    let missing_in_comparison: Vec<&AuditFrame> = baseline
        .frames()
        .iter()
        .filter(|f| !comp.ids.contains(f.id.as_str()))
        .collect();
    let missing_in_baseline: Vec<&AuditFrame> = comparison
        .frames()
        .iter()
        .filter(|f| !base.ids.contains(f.id.as_str()))
        .collect();

    let event_types: BTreeSet<&String> = base.counts.keys().chain(comp.counts.keys()).collect();
    let metric_divergence: BTreeMap<String, i64> = event_types
        .into_iter()
        .map(|t| (t.clone(), comp.count(t) - base.count(t)))
        .collect();

    let added: Vec<&str> = comp.signals.difference(&base.signals).copied().collect();
    let missing: Vec<&str> = base.signals.difference(&comp.signals).copied().collect();

    let mut explanations = Vec::new();
    let mut trust_safety_changes = Vec::new();

    for (event_type, delta) in &metric_divergence {
        if *delta == 0 {
            continue;
        }
        let domain = domain_of(event_type);
        explanations.push(DiffExplanation {
            kind: ExplanationKind::MetricDivergence,
            description: format!("{event_type} count changed by {delta:+}"),
            domain: domain.to_string(),
            governance: governance_for_domain(domain, comparison, baseline),
            frame_id: None,
            synthetic_context: None,
        });
    }

    for (signals, label, owner) in [(&added, "Added", comparison), (&missing, "Missing", baseline)] {
        for signal in signals {
            let description = format!("{label} trust-safety signal: {signal}");
            let frame = owner.frames().iter().find(|f| f.signals().iter().any(|s| s == signal));
            let domain = frame.map(|f| f.domain().to_string()).unwrap_or_default();
            explanations.push(DiffExplanation {
                kind: ExplanationKind::TrustSafetyChange,
                description: description.clone(),
                governance: frame
                    .map(|f| f.governance.clone())
                    .unwrap_or_else(|| GovernanceSnapshot::default_for(domain.clone())),
                domain,
                frame_id: frame.map(|f| f.id.clone()),
                synthetic_context: frame.and_then(|f| f.synthetic_context.clone()),
            });
            trust_safety_changes.push(description);
        }
    }

    for (frames, side) in [
        (&missing_in_comparison, "comparison"),
        (&missing_in_baseline, "baseline"),
    ] {
        for frame in frames {
            explanations.push(DiffExplanation {
                kind: ExplanationKind::MissingFrame,
                description: format!("Frame {} ({}) missing in {side}", frame.id, frame.event_type()),
                domain: frame.domain().to_string(),
                governance: frame.governance.clone(),
                frame_id: Some(frame.id.clone()),
                synthetic_context: frame.synthetic_context.clone(),
            });
        }
    }

    explanations.sort_by(|a, b| a.description.cmp(&b.description));

    let latency_p95_delta = match (base.latency_p95, comp.latency_p95) {
        (Some(b), Some(c)) => Some(c - b),
        _ => None,
    };

    let diff = TimelineDiff {
        baseline_id: baseline.id().to_string(),
        comparison_id: comparison.id().to_string(),
        missing_in_comparison: missing_in_comparison.iter().map(|f| f.id.clone()).collect(),
        missing_in_baseline: missing_in_baseline.iter().map(|f| f.id.clone()).collect(),
        slo_impacts: SloImpacts {
            latency_p95_delta,
            booking_delta: comp.count(BOOKING_CREATED) - base.count(BOOKING_CREATED),
            cancellation_delta: comp.count(BOOKING_CANCELLED) - base.count(BOOKING_CANCELLED),
        },
        metric_divergence,
        trust_safety_changes,
        explanations,
    };

    tracing::debug!(
        baseline_id = %diff.baseline_id,
        comparison_id = %diff.comparison_id,
        explanations = diff.explanations.len(),
        "timelines diffed"
    );

    diff
}

/// Governance of the domain's first frame in `primary`, else `fallback`, else a stub.
fn governance_for_domain(
    domain: &str,
    primary: &AuditTimeline,
    fallback: &AuditTimeline,
) -> GovernanceSnapshot {
    [primary, fallback]
        .into_iter()
        .find_map(|timeline| timeline.frames().iter().find(|f| f.domain() == domain))
        .map(|frame| frame.governance.clone())
        .unwrap_or_else(|| GovernanceSnapshot::default_for(domain))
}
