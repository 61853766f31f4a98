//! Canonical analytics envelope.
//!
//! Upstream pipelines emit envelopes with an open metadata map. The ingestion
//! adapter (`crate::ingest`) resolves every convention-based lookup once, so the
//! rest of the kernel only ever sees this typed shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::governance::EvolutionFlags;

/// Source name used by the synthetic traffic generator.
pub const SIMCITY_SOURCE: &str = "simcity";

/// Derive the governance domain of an event type (its first dot-segment).
pub fn domain_of(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}

/// Whether an envelope came from real traffic or a synthetic source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Observed production traffic.
    Real,
    /// Generated or simulated traffic.
    Synthetic,
}

impl Provenance {
    /// Check if this provenance is synthetic.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Clock values attached to an envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timebase {
    /// Monotonic logical counter.
    pub logical: u64,
    /// Simulation clock, present for simulated traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_time: Option<f64>,
}

/// The typed event carried by an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeEvent {
    /// Dot-namespaced event type, e.g. `booking.cancelled`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque event payload.
    #[serde(default)]
    pub payload: Value,
}

/// Simulation context attached by the synthetic traffic generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimcityMetadata {
    /// Explicit synthetic marker.
    #[serde(default)]
    pub synthetic: bool,
    /// Simulation run identifier.
    pub run_id: Option<String>,
    /// Scenario identifier.
    pub scenario_id: Option<String>,
    /// Run this one was forked from.
    pub fork_of: Option<String>,
    /// Whether this run is the scenario baseline.
    pub baseline: Option<bool>,
    /// Simulation clock.
    pub sim_time: Option<f64>,
    /// Logical time inside the simulation.
    pub logical_time: Option<u64>,
    /// Whether trust-safety data was simulated.
    #[serde(default)]
    pub simulated: bool,
    /// Trust-safety signals reported by the simulation.
    #[serde(default)]
    pub trust_safety_signals: Vec<String>,
    /// Severity reported by the simulation.
    pub severity: Option<String>,
}

/// Typed envelope metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Top-level synthetic marker.
    #[serde(default)]
    pub synthetic: bool,
    /// Simulation context, if any.
    pub simcity: Option<SimcityMetadata>,
    /// Trust-safety signals reported by the producer.
    #[serde(default)]
    pub trust_safety_signals: Vec<String>,
    /// Free-form signal tags.
    #[serde(default)]
    pub signals: Vec<String>,
    /// Contract evolution flags declared by the producer.
    pub evolution: Option<EvolutionFlags>,
    /// p95 latency sample in milliseconds.
    pub latency_p95_ms: Option<f64>,
    /// Anomaly severity label.
    pub severity: Option<String>,
}

/// One immutable analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEnvelope {
    /// Envelope ID (unique within a stream).
    pub id: String,
    /// Envelope schema version.
    pub version: String,
    /// Wall-clock time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Logical and simulation clocks.
    pub timebase: Timebase,
    /// Producer name.
    pub source: String,
    /// The event.
    pub event: EnvelopeEvent,
    /// Normalized metadata.
    #[serde(default)]
    pub metadata: EnvelopeMetadata,
}

impl AnalyticsEnvelope {
    /// Create an envelope with empty metadata and a null payload.
    pub fn new(
        id: impl Into<String>,
        timestamp: i64,
        logical: u64,
        source: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version: "v1".to_string(),
            timestamp,
            timebase: Timebase { logical, sim_time: None },
            source: source.into(),
            event: EnvelopeEvent {
                event_type: event_type.into(),
                payload: Value::Null,
            },
            metadata: EnvelopeMetadata::default(),
        }
    }

    /// Set the event payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.event.payload = payload;
        self
    }

    /// Set the simulation clock.
    pub fn with_sim_time(mut self, sim_time: f64) -> Self {
        self.timebase.sim_time = Some(sim_time);
        self
    }

    /// Replace the metadata.
    pub fn with_metadata(mut self, metadata: EnvelopeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mark the envelope as synthetic via the top-level marker.
    pub fn synthetic(mut self) -> Self {
        self.metadata.synthetic = true;
        self
    }

    /// Attach trust-safety signals.
    pub fn with_trust_safety_signals(
        mut self,
        signals: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.metadata.trust_safety_signals = signals.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a latency sample.
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.metadata.latency_p95_ms = Some(latency_ms);
        self
    }

    /// Attach an anomaly severity.
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.metadata.severity = Some(severity.into());
        self
    }

    /// Attach producer-declared evolution flags.
    pub fn with_evolution(mut self, evolution: EvolutionFlags) -> Self {
        self.metadata.evolution = Some(evolution);
        self
    }

    /// Attach simulation context.
    pub fn with_simcity(mut self, simcity: SimcityMetadata) -> Self {
        self.metadata.simcity = Some(simcity);
        self
    }

    /// Event type shortcut.
    pub fn event_type(&self) -> &str {
        &self.event.event_type
    }

    /// Governance domain of this envelope.
    pub fn domain(&self) -> &str {
        domain_of(&self.event.event_type)
    }

    /// Classify provenance.
    ///
    /// Synthetic iff the top-level marker is set, the source is the simulation
    /// generator, or the simulation context carries its own marker.
    pub fn provenance(&self) -> Provenance {
        let simcity_marked = self
            .metadata
            .simcity
            .as_ref()
            .map(|s| s.synthetic)
            .unwrap_or(false);

        if self.metadata.synthetic || self.source == SIMCITY_SOURCE || simcity_marked {
            Provenance::Synthetic
        } else {
            Provenance::Real
        }
    }

    /// All trust-safety signals, top-level first, deduplicated in first-seen order.
    pub fn trust_safety_signals(&self) -> Vec<String> {
        let simcity = self
            .metadata
            .simcity
            .iter()
            .flat_map(|s| s.trust_safety_signals.iter());

        let mut out: Vec<String> = Vec::new();
        for signal in self.metadata.trust_safety_signals.iter().chain(simcity) {
            if !out.contains(signal) {
                out.push(signal.clone());
            }
        }
        out
    }
}
