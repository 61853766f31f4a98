//! Audit frames and timelines.
//!
//! An `AuditTimeline` can only be produced by the timeline builder
//! (`crate::audit::timeline`). Its frame list is private, so once built it is
//! read-only for every holder: recomputation means rebuilding from envelopes.

use serde::Serialize;
use std::collections::BTreeMap;

use super::envelope::{AnalyticsEnvelope, Provenance};
use super::governance::{EvolutionFlags, GovernanceSnapshot};

/// Trust-safety signals observed on a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustSafetySnapshot {
    /// Provenance of the frame carrying the signals.
    pub provenance: Provenance,
    /// Deduplicated signal names (never empty).
    pub signals: Vec<String>,
}

/// Simulation lineage of a synthetic frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticContext {
    /// Simulation run identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Scenario identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    /// Run this one was forked from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fork_of: Option<String>,
    /// Whether the run is the scenario baseline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<bool>,
}

/// One envelope wrapped with derived governance and provenance facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFrame {
    /// Frame ID (equals the envelope ID).
    pub id: String,
    /// Position in the timeline.
    pub index: usize,
    /// Logical clock value.
    pub logical_time: u64,
    /// Wall-clock time in milliseconds.
    pub timestamp: i64,
    /// Simulation clock, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_time: Option<f64>,
    /// The source envelope.
    pub envelope: AnalyticsEnvelope,
    /// Real or synthetic.
    pub provenance: Provenance,
    /// Governance decision for this frame.
    pub governance: GovernanceSnapshot,
    /// Resolved evolution flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution: Option<EvolutionFlags>,
    /// Trust-safety signals; `None` means no data, never an empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_safety: Option<TrustSafetySnapshot>,
    /// Simulation lineage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthetic_context: Option<SyntheticContext>,
}

impl AuditFrame {
    /// Governance domain of this frame.
    pub fn domain(&self) -> &str {
        &self.governance.domain
    }

    /// Event type of the wrapped envelope.
    pub fn event_type(&self) -> &str {
        &self.envelope.event.event_type
    }

    /// Trust-safety signals, empty when there is no snapshot.
    pub fn signals(&self) -> &[String] {
        self.trust_safety
            .as_ref()
            .map(|ts| ts.signals.as_slice())
            .unwrap_or(&[])
    }

    /// Latency sample carried by the envelope.
    pub fn latency_ms(&self) -> Option<f64> {
        self.envelope.metadata.latency_p95_ms
    }
}

/// Real/synthetic frame counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    /// Frames from real traffic.
    pub real: usize,
    /// Frames from synthetic traffic.
    pub synthetic: usize,
}

impl SourceCounts {
    /// Count one frame.
    pub fn record(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::Real => self.real += 1,
            Provenance::Synthetic => self.synthetic += 1,
        }
    }

    /// Total frames.
    pub fn total(&self) -> usize {
        self.real + self.synthetic
    }
}

/// Identity of the registry a timeline was checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRef {
    /// Registry content fingerprint.
    pub fingerprint: String,
    /// Governed domains at build time.
    pub domains: Vec<String>,
}

/// Immutable, governance-checked sequence of frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTimeline {
    id: String,
    frames: Vec<AuditFrame>,
    started_at: Option<i64>,
    ended_at: Option<i64>,
    registry: RegistryRef,
    sources: SourceCounts,
    domains: Vec<String>,
    evolution_flags: BTreeMap<String, EvolutionFlags>,
}

impl AuditTimeline {
    /// Assemble a timeline from validated frames.
    ///
    /// Callers must have verified ordering and governance; only the builder
    /// does so.
    pub(crate) fn from_validated_frames(
        id: String,
        frames: Vec<AuditFrame>,
        registry: RegistryRef,
    ) -> Self {
        let mut sources = SourceCounts::default();
        let mut domains: Vec<String> = Vec::new();
        let mut evolution_flags: BTreeMap<String, EvolutionFlags> = BTreeMap::new();

        for frame in &frames {
            sources.record(frame.provenance);
            domains.push(frame.domain().to_string());
            if let Some(evolution) = &frame.evolution {
                evolution_flags
                    .entry(frame.domain().to_string())
                    .or_insert_with(|| evolution.clone());
            }
        }
        domains.sort();
        domains.dedup();

        Self {
            id,
            started_at: frames.first().map(|f| f.timestamp),
            ended_at: frames.last().map(|f| f.timestamp),
            frames,
            registry,
            sources,
            domains,
            evolution_flags,
        }
    }

    /// Timeline ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Frames in chronological order.
    pub fn frames(&self) -> &[AuditFrame] {
        &self.frames
    }

    /// Frame at `index`.
    pub fn frame(&self, index: usize) -> Option<&AuditFrame> {
        self.frames.get(index)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the timeline has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Timestamp of the first frame.
    pub fn started_at(&self) -> Option<i64> {
        self.started_at
    }

    /// Timestamp of the last frame.
    pub fn ended_at(&self) -> Option<i64> {
        self.ended_at
    }

    /// Registry the timeline was checked against.
    pub fn registry(&self) -> &RegistryRef {
        &self.registry
    }

    /// Real/synthetic counts.
    pub fn sources(&self) -> SourceCounts {
        self.sources
    }

    /// Sorted unique domains.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// First-seen evolution flags per domain.
    pub fn evolution_flags(&self) -> &BTreeMap<String, EvolutionFlags> {
        &self.evolution_flags
    }
}
