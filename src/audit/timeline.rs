//! Governance-checked timeline construction.
//!
//! ## Fail-Closed Rules
//!
//! | Condition | Error |
//! |-----------|-------|
//! | timestamp or logical time decreases | `OrderingViolation` |
//! | domain has no registry entry | `UngovernedDomain` |
//! | envelope after a deprecated domain's sunset | `GovernanceCutoffViolation` |
//! | synthetic envelope while synthetic data is disallowed | `SyntheticNotAllowed` |
//!
//! Ordering problems are never repaired: an upstream ordering bug must stay
//! visible. A failed build yields no partial timeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::fingerprint_hex;
use crate::types::{
    AnalyticsEnvelope, AuditFrame, AuditTimeline, DomainRegistryEntry, EvolutionFlags,
    GovernanceLookup, GovernanceSnapshot, Provenance, RegistryRef, SunsetCutoff, SyntheticContext,
    TrustSafetySnapshot,
};

/// Error raised while building a timeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    /// Envelopes are not non-decreasing in timestamp and logical time.
    #[error(
        "Ordering violation at envelope {envelope_id} (index {index}): \
         ({timestamp}, {logical}) follows ({previous_timestamp}, {previous_logical})"
    )]
    OrderingViolation {
        /// Offending envelope.
        envelope_id: String,
        /// Position in the input.
        index: usize,
        /// Offending timestamp.
        timestamp: i64,
        /// Offending logical time.
        logical: u64,
        /// Previous timestamp.
        previous_timestamp: i64,
        /// Previous logical time.
        previous_logical: u64,
    },
    /// No registry entry for the envelope's domain.
    #[error("Non-governed envelope {envelope_id}: domain `{domain}` has no registry entry")]
    UngovernedDomain {
        /// Offending envelope.
        envelope_id: String,
        /// Domain without an entry.
        domain: String,
    },
    /// Envelope postdates the domain's deprecation sunset.
    #[error(
        "Governance cutoff violated by envelope {envelope_id}: domain `{domain}` sunset at {sunset_date}"
    )]
    GovernanceCutoffViolation {
        /// Offending envelope.
        envelope_id: String,
        /// Deprecated domain.
        domain: String,
        /// Declared sunset date.
        sunset_date: String,
    },
    /// Synthetic envelope while synthetic data is disallowed.
    #[error("Synthetic envelope {envelope_id} not allowed in this timeline")]
    SyntheticNotAllowed {
        /// Offending envelope.
        envelope_id: String,
    },
}

impl TimelineError {
    /// Envelope that caused the failure.
    pub fn envelope_id(&self) -> &str {
        match self {
            Self::OrderingViolation { envelope_id, .. }
            | Self::UngovernedDomain { envelope_id, .. }
            | Self::GovernanceCutoffViolation { envelope_id, .. }
            | Self::SyntheticNotAllowed { envelope_id } => envelope_id,
        }
    }
}

/// Options for building a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineOptions {
    /// Timeline ID. Defaults to a hash of the envelope IDs.
    pub id: Option<String>,
    /// Whether synthetic envelopes may enter the timeline.
    pub allow_synthetic: bool,
    /// Per-domain evolution flags that take precedence over everything else.
    pub evolution_overrides: BTreeMap<String, EvolutionFlags>,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            id: None,
            allow_synthetic: true,
            evolution_overrides: BTreeMap::new(),
        }
    }
}

impl TimelineOptions {
    /// Options with an explicit timeline ID.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Reject synthetic envelopes.
    pub fn real_only(mut self) -> Self {
        self.allow_synthetic = false;
        self
    }

    /// Override evolution flags for a domain.
    pub fn with_evolution_override(mut self, domain: impl Into<String>, flags: EvolutionFlags) -> Self {
        self.evolution_overrides.insert(domain.into(), flags);
        self
    }
}

/// Build an audit timeline from envelopes already ordered by `(timestamp, logical)`.
pub fn build_audit_timeline<R: GovernanceLookup + ?Sized>(
    envelopes: &[AnalyticsEnvelope],
    registry: &R,
    options: &TimelineOptions,
) -> Result<AuditTimeline, TimelineError> {
    let id = options.id.clone().unwrap_or_else(|| default_timeline_id(envelopes));

    let result = build_frames(envelopes, registry, options);
    let frames = match result {
        Ok(frames) => frames,
        Err(err) => {
            tracing::warn!(
                timeline_id = %id,
                envelope_id = %err.envelope_id(),
                error = %err,
                "audit timeline rejected"
            );
            return Err(err);
        }
    };

    let registry_ref = RegistryRef {
        fingerprint: registry.fingerprint(),
        domains: registry.domains(),
    };
    let timeline = AuditTimeline::from_validated_frames(id, frames, registry_ref);

    tracing::debug!(
        timeline_id = %timeline.id(),
        frames = timeline.len(),
        real = timeline.sources().real,
        synthetic = timeline.sources().synthetic,
        "audit timeline built"
    );

    Ok(timeline)
}

fn default_timeline_id(envelopes: &[AnalyticsEnvelope]) -> String {
    let ids: Vec<&str> = envelopes.iter().map(|e| e.id.as_str()).collect();
    format!("timeline:{}", fingerprint_hex(&ids))
}

fn build_frames<R: GovernanceLookup + ?Sized>(
    envelopes: &[AnalyticsEnvelope],
    registry: &R,
    options: &TimelineOptions,
) -> Result<Vec<AuditFrame>, TimelineError> {
    let mut frames = Vec::with_capacity(envelopes.len());
    let mut previous: Option<&AnalyticsEnvelope> = None;

    for (index, envelope) in envelopes.iter().enumerate() {
        if let Some(prev) = previous {
            if envelope.timestamp < prev.timestamp || envelope.timebase.logical < prev.timebase.logical {
                return Err(TimelineError::OrderingViolation {
                    envelope_id: envelope.id.clone(),
                    index,
                    timestamp: envelope.timestamp,
                    logical: envelope.timebase.logical,
                    previous_timestamp: prev.timestamp,
                    previous_logical: prev.timebase.logical,
                });
            }
        }
        previous = Some(envelope);

        frames.push(build_frame(index, envelope, registry, options)?);
    }

    Ok(frames)
}

fn build_frame<R: GovernanceLookup + ?Sized>(
    index: usize,
    envelope: &AnalyticsEnvelope,
    registry: &R,
    options: &TimelineOptions,
) -> Result<AuditFrame, TimelineError> {
    let domain = envelope.domain();
    let entry = registry
        .entry(domain)
        .ok_or_else(|| TimelineError::UngovernedDomain {
            envelope_id: envelope.id.clone(),
            domain: domain.to_string(),
        })?;

    let governance = governance_for(envelope, entry)?;

    let provenance = envelope.provenance();
    if provenance == Provenance::Synthetic && !options.allow_synthetic {
        return Err(TimelineError::SyntheticNotAllowed {
            envelope_id: envelope.id.clone(),
        });
    }

    let evolution = options
        .evolution_overrides
        .get(domain)
        .or(envelope.metadata.evolution.as_ref())
        .or(entry.evolution.as_ref())
        .cloned();

    let signals = envelope.trust_safety_signals();
    let trust_safety = (!signals.is_empty()).then(|| TrustSafetySnapshot { provenance, signals });

    let synthetic_context = envelope.metadata.simcity.as_ref().map(|sim| SyntheticContext {
        run_id: sim.run_id.clone(),
        scenario_id: sim.scenario_id.clone(),
        fork_of: sim.fork_of.clone(),
        baseline: sim.baseline,
    });

    Ok(AuditFrame {
        id: envelope.id.clone(),
        index,
        logical_time: envelope.timebase.logical,
        timestamp: envelope.timestamp,
        sim_time: envelope.timebase.sim_time,
        envelope: envelope.clone(),
        provenance,
        governance,
        evolution,
        trust_safety,
        synthetic_context,
    })
}

/// Resolve the governance decision for one envelope.
fn governance_for(
    envelope: &AnalyticsEnvelope,
    entry: &DomainRegistryEntry,
) -> Result<GovernanceSnapshot, TimelineError> {
    let deprecation = entry.deprecation.as_ref().filter(|d| d.will_deprecate);

    let (permitted, reason) = match deprecation {
        None => (true, None),
        Some(policy) => match policy.sunset_cutoff() {
            SunsetCutoff::At(cutoff) if envelope.timestamp > cutoff => {
                return Err(TimelineError::GovernanceCutoffViolation {
                    envelope_id: envelope.id.clone(),
                    domain: entry.domain.clone(),
                    sunset_date: policy.sunset_date.clone().unwrap_or_default(),
                });
            }
            SunsetCutoff::At(_) => (
                true,
                Some(format!(
                    "Domain {} is scheduled for sunset on {}",
                    entry.domain,
                    policy.sunset_date.as_deref().unwrap_or_default()
                )),
            ),
            SunsetCutoff::Unscheduled => (
                false,
                Some(format!(
                    "Domain {} is marked for deprecation without a sunset date",
                    entry.domain
                )),
            ),
            SunsetCutoff::Unparsable => (
                false,
                Some(format!(
                    "Domain {} is marked for deprecation with an unreadable sunset date `{}`",
                    entry.domain,
                    policy.sunset_date.as_deref().unwrap_or_default()
                )),
            ),
        },
    };

    Ok(GovernanceSnapshot {
        domain: entry.domain.clone(),
        permitted,
        reason,
        evolution: entry.evolution.clone(),
        deprecation: entry.deprecation.clone(),
        entry: Some(entry.clone()),
    })
}
