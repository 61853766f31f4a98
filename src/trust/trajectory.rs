//! Risk trajectory construction.
//!
//! Each frame folds into a running [`RiskVector`]: event adjustments first,
//! then trust-safety signal adjustments, clamping after every step. One
//! snapshot is emitted per frame, so the trajectory can be reproduced from the
//! timeline alone.

use super::policy::{RiskModelV1, RiskVector};
use crate::types::{
    AuditFrame, AuditTimeline, DerivedFrom, RiskDimension, RiskMetric, RiskModelRef,
    RiskStateSnapshot, RiskTrajectory,
};

const ACCUMULATION_ASSUMPTION: &str =
    "Trajectory uses monotonic accumulation; reliability decays on negative signals.";
const GROUND_TRUTH_ASSUMPTION: &str =
    "Analytics envelopes are treated as ground truth; no commands emitted.";
const SYNTHETIC_ASSUMPTION: &str =
    "Synthetic provenance adjusts confidence downward; interpretations remain diagnostic-only.";
const EMPTY_TIMELINE_WARNING: &str = "No frames provided; trajectory contains no risk evolution.";

/// Builds risk trajectories under a fixed model.
#[derive(Debug, Clone, Default)]
pub struct RiskTrajectoryBuilder {
    model: RiskModelV1,
}

impl RiskTrajectoryBuilder {
    /// Create a builder for a model.
    pub fn new(model: RiskModelV1) -> Self {
        Self { model }
    }

    /// Model in use.
    pub fn model(&self) -> &RiskModelV1 {
        &self.model
    }

    /// Build the trajectory for a timeline.
    ///
    /// `id` defaults to `risk-trajectory:<timeline id>`.
    pub fn build(&self, timeline: &AuditTimeline, id: Option<&str>) -> RiskTrajectory {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| format!("risk-trajectory:{}", timeline.id()));

        let mut previous = self.model.seed;
        let mut snapshots = Vec::with_capacity(timeline.len());

        for frame in timeline.frames() {
            let state = self.advance(&previous, frame);
            snapshots.push(self.snapshot(&id, timeline, frame, &state, &previous));
            previous = state;
        }

        let mut warnings = Vec::new();
        if snapshots.is_empty() {
            warnings.push(EMPTY_TIMELINE_WARNING.to_string());
        }

        tracing::debug!(
            trajectory_id = %id,
            timeline_id = %timeline.id(),
            snapshots = snapshots.len(),
            "risk trajectory built"
        );

        RiskTrajectory {
            timeline_id: timeline.id().to_string(),
            started_at: timeline.started_at(),
            ended_at: timeline.ended_at(),
            snapshots,
            derived_from: DerivedFrom {
                frame_ids: timeline.frames().iter().map(|f| f.id.clone()).collect(),
                timeline_started_at: timeline.started_at(),
            },
            warnings,
            replay_compatible: true,
            model: RiskModelRef {
                version: self.model.version.clone(),
                params_hash: self.model.params_hash(),
            },
            id,
        }
    }

    fn advance(&self, previous: &RiskVector, frame: &AuditFrame) -> RiskVector {
        let metadata = &frame.envelope.metadata;
        let state = self.model.apply_event(
            previous,
            frame.event_type(),
            metadata.severity.as_deref(),
            metadata.latency_p95_ms,
        );
        self.model.apply_signals(&state, frame.signals())
    }

    fn snapshot(
        &self,
        trajectory_id: &str,
        timeline: &AuditTimeline,
        frame: &AuditFrame,
        state: &RiskVector,
        previous: &RiskVector,
    ) -> RiskStateSnapshot {
        let signals: Vec<String> = std::iter::once(frame.event_type().to_string())
            .chain(frame.signals().iter().cloned())
            .chain(frame.envelope.metadata.signals.iter().cloned())
            .collect();

        let confidence = self
            .model
            .confidence(signals.len(), frame.provenance.is_synthetic());

        let metric_signals: Vec<String> = std::iter::once(frame.domain().to_string())
            .chain(signals.iter().cloned())
            .collect();

        let metrics = RiskDimension::ALL
            .iter()
            .map(|&dimension| RiskMetric {
                dimension,
                value: state.get(dimension),
                trend: self.model.trend(state.get(dimension), previous.get(dimension)),
                confidence,
                signals: metric_signals.clone(),
                rationale: dimension.rationale().to_string(),
            })
            .collect();

        let mut assumptions = vec![
            ACCUMULATION_ASSUMPTION.to_string(),
            GROUND_TRUTH_ASSUMPTION.to_string(),
        ];
        if frame.provenance.is_synthetic() {
            assumptions.push(SYNTHETIC_ASSUMPTION.to_string());
        }

        RiskStateSnapshot {
            id: format!("{trajectory_id}:{}", frame.id),
            frame_id: frame.id.clone(),
            timeline_id: timeline.id().to_string(),
            domain: frame.domain().to_string(),
            timestamp: frame.timestamp,
            logical_time: frame.logical_time,
            provenance: frame.provenance,
            metrics,
            signals,
            assumptions,
            governance: frame.governance.clone(),
            evolution: frame.evolution.clone(),
            synthetic_context: frame.synthetic_context.clone(),
        }
    }
}

/// Build a trajectory with the default model.
pub fn build_risk_trajectory(timeline: &AuditTimeline, id: Option<&str>) -> RiskTrajectory {
    RiskTrajectoryBuilder::default().build(timeline, id)
}
