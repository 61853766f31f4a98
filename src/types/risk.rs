//! Risk trajectory types.
//!
//! Four bounded dimensions are tracked per frame. Reliability is the only
//! "higher is better" dimension; everything else is a hazard.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::envelope::Provenance;
use super::frame::SyntheticContext;
use super::governance::{EvolutionFlags, GovernanceSnapshot};

/// A trust/safety risk dimension. Values are always in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskDimension {
    /// Likelihood that activity is fraudulent.
    FraudLikelihood,
    /// Hazard that a booking ends in a no-show.
    NoShowHazard,
    /// Reliability of the provider (higher is better).
    ProviderReliability,
    /// Risk of platform abuse.
    AbuseRisk,
}

impl RiskDimension {
    /// All dimensions in snapshot order.
    pub const ALL: [RiskDimension; 4] = [
        RiskDimension::FraudLikelihood,
        RiskDimension::NoShowHazard,
        RiskDimension::ProviderReliability,
        RiskDimension::AbuseRisk,
    ];

    /// Wire name of the dimension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FraudLikelihood => "fraudLikelihood",
            Self::NoShowHazard => "noShowHazard",
            Self::ProviderReliability => "providerReliability",
            Self::AbuseRisk => "abuseRisk",
        }
    }

    /// Fixed explanation of what moves this dimension.
    pub fn rationale(&self) -> &'static str {
        match self {
            Self::ProviderReliability => {
                "Reliability decays with cancellations, incidents, and latency spikes."
            }
            Self::NoShowHazard => {
                "No-show hazard rises with cancellations and trust safety signals referencing cancellations."
            }
            Self::AbuseRisk => "Abuse risk aggregates anomalies and explicit abuse signals.",
            Self::FraudLikelihood => {
                "Fraud likelihood increases with anomalies, chargebacks, and fraud-tagged signals."
            }
        }
    }
}

impl fmt::Display for RiskDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a metric relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    /// Increased beyond the trend epsilon.
    Up,
    /// Decreased beyond the trend epsilon.
    Down,
    /// Within the trend epsilon.
    Flat,
}

/// Confidence in a snapshot's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskConfidence {
    /// Fewer than two contributing signals.
    Low,
    /// Some corroboration, or synthetic provenance.
    Medium,
    /// Well-corroborated real traffic.
    High,
}

impl fmt::Display for RiskConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One dimension's score at a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetric {
    /// Dimension scored.
    pub dimension: RiskDimension,
    /// Score in `[0, 1]`.
    pub value: f64,
    /// Movement relative to the previous snapshot.
    pub trend: RiskTrend,
    /// Confidence in the score.
    pub confidence: RiskConfidence,
    /// Domain followed by the contributing signals.
    pub signals: Vec<String>,
    /// Why this dimension moves.
    pub rationale: String,
}

/// Risk state derived from one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskStateSnapshot {
    /// Snapshot ID (`<trajectory id>:<frame id>`).
    pub id: String,
    /// Originating frame.
    pub frame_id: String,
    /// Originating timeline.
    pub timeline_id: String,
    /// Governance domain of the frame.
    pub domain: String,
    /// Frame wall-clock time.
    pub timestamp: i64,
    /// Frame logical time.
    pub logical_time: u64,
    /// Frame provenance.
    pub provenance: Provenance,
    /// One metric per dimension, in [`RiskDimension::ALL`] order.
    pub metrics: Vec<RiskMetric>,
    /// Event type, trust-safety signals and metadata signals.
    pub signals: Vec<String>,
    /// Caveats on interpreting this snapshot.
    pub assumptions: Vec<String>,
    /// Frame governance.
    pub governance: GovernanceSnapshot,
    /// Frame evolution flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution: Option<EvolutionFlags>,
    /// Frame simulation lineage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthetic_context: Option<SyntheticContext>,
}

impl RiskStateSnapshot {
    /// Metric for a dimension.
    pub fn metric(&self, dimension: RiskDimension) -> Option<&RiskMetric> {
        self.metrics.iter().find(|m| m.dimension == dimension)
    }

    /// Value for a dimension, 0 when the metric is missing.
    pub fn value(&self, dimension: RiskDimension) -> f64 {
        self.metric(dimension).map(|m| m.value).unwrap_or(0.0)
    }

    /// Confidence shared by the snapshot's metrics.
    pub fn confidence(&self) -> RiskConfidence {
        self.metrics
            .first()
            .map(|m| m.confidence)
            .unwrap_or(RiskConfidence::Low)
    }

    /// Combined risk with reliability inverted: `(fraud + noShow + abuse + (1 - reliability)) / 4`.
    pub fn composite_risk(&self) -> f64 {
        (self.value(RiskDimension::FraudLikelihood)
            + self.value(RiskDimension::NoShowHazard)
            + self.value(RiskDimension::AbuseRisk)
            + (1.0 - self.value(RiskDimension::ProviderReliability)))
            / 4.0
    }
}

/// Frame provenance of a trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFrom {
    /// Every frame the trajectory was derived from, in order.
    pub frame_ids: Vec<String>,
    /// Start of the source timeline.
    pub timeline_started_at: Option<i64>,
}

/// Identity of the risk model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskModelRef {
    /// Model version identifier.
    pub version: String,
    /// Hash of the quantized model parameters.
    pub params_hash: String,
}

/// Ordered risk snapshots for one timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskTrajectory {
    /// Trajectory ID.
    pub id: String,
    /// Source timeline.
    pub timeline_id: String,
    /// Start of the source timeline.
    pub started_at: Option<i64>,
    /// End of the source timeline.
    pub ended_at: Option<i64>,
    /// One snapshot per frame.
    pub snapshots: Vec<RiskStateSnapshot>,
    /// Frame-level provenance.
    pub derived_from: DerivedFrom,
    /// Non-fatal issues.
    pub warnings: Vec<String>,
    /// Whether the trajectory can be reproduced by replaying the timeline.
    pub replay_compatible: bool,
    /// Model configuration that produced the scores.
    pub model: RiskModelRef,
}

impl RiskTrajectory {
    /// Last snapshot, if any.
    pub fn latest(&self) -> Option<&RiskStateSnapshot> {
        self.snapshots.last()
    }

    /// Check if the trajectory has no snapshots.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
