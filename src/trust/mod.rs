//! Trust layer: risk trajectories, threshold justification and counterfactuals.
//!
//! ```text
//! AuditTimeline ──► RiskTrajectoryBuilder(RiskModelV1) ──► RiskTrajectory
//!                                                            │
//!                         TrustSafetyThreshold[] ──► evaluate_thresholds
//!                                                            │
//!      (baseline, variant) pairs ──► analyze_counterfactual ◄┘
//! ```
//!
//! Everything here is diagnostic. No function emits a command or touches
//! external state.

pub mod counterfactual;
pub mod policy;
pub mod thresholds;
pub mod trajectory;

pub use counterfactual::{
    analyze_counterfactual, CounterfactualDelta, CounterfactualInput, CounterfactualObservation,
    CounterfactualSignal, InterventionCounterfactual,
};
pub use policy::{ConfidenceCutoffs, LatencyAdjustments, RiskModelV1, RiskVector, SeverityWeights, SignalRule};
pub use thresholds::{evaluate_thresholds, ThresholdEvaluation};
pub use trajectory::{build_risk_trajectory, RiskTrajectoryBuilder};
