//! # audit-trust-kernel
//!
//! Deterministic audit replay and trust-risk derivation for analytics envelopes.
//!
//! The kernel answers one question:
//!
//! > Given an ordered stream of governed events, what happened, how did risk
//! > evolve, and would an intervention have been justified?
//!
//! ## Core Contract
//!
//! 1. Build an immutable, governance-checked [`AuditTimeline`] from envelopes
//! 2. Replay, jump through, and diff timelines without side effects
//! 3. Derive a bounded [`RiskTrajectory`] and justify (or block) interventions
//! 4. Compare a baseline against a what-if variant as signed deltas
//!
//! ## Architecture
//!
//! ```text
//! raw JSON → EnvelopeAdapterV1 → AnalyticsEnvelope[] → build_audit_timeline → AuditTimeline
//!                                                            ↑                    │
//!                                                    GovernanceLookup             ├→ replay / diff
//!                                                                                 └→ RiskTrajectory
//!                                                                                      ├→ evaluate_thresholds
//!                                                                                      └→ analyze_counterfactual
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same envelopes + same registry + same options → identical timeline
//! - Replay state at a position depends only on the frames before it
//! - Same timeline + same [`RiskModelV1`] → identical trajectory and `paramsHash`
//! - All maps are `BTreeMap`; nothing reads clocks, randomness, or the environment

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod canonical;
pub mod ingest;
pub mod telemetry;
pub mod trust;
pub mod types;

// Re-exports
pub use types::{
    AnalyticsEnvelope, EnvelopeEvent, EnvelopeMetadata, Provenance, SimcityMetadata, Timebase,
};
pub use types::{
    DeprecationPolicy, DomainContract, DomainRegistry, DomainRegistryEntry, EvolutionFlags,
    GovernanceLookup, GovernanceSnapshot,
};
pub use types::{AuditFrame, AuditTimeline, SourceCounts, SyntheticContext, TrustSafetySnapshot};
pub use types::{
    RiskConfidence, RiskDimension, RiskMetric, RiskStateSnapshot, RiskTrajectory, RiskTrend,
};
pub use types::{
    Comparator, InterventionClass, InterventionDecision, InterventionJustification,
    ThresholdCrossing, TrustSafetyThreshold,
};
pub use ingest::{EnvelopeAdapterV1, IngestError, ENVELOPE_ADAPTER_VERSION};
pub use audit::{
    build_audit_timeline, create_cursor, diff_timelines, jump_to_event, jump_to_time,
    replay_deterministically, replay_next, state_at, DiffExplanation, ExplanationKind,
    ReplayCursor, ReplayState, ReplayStep, SloImpacts, TimelineDiff, TimelineError,
    TimelineOptions,
};
pub use trust::{
    analyze_counterfactual, build_risk_trajectory, evaluate_thresholds, CounterfactualDelta,
    CounterfactualInput, CounterfactualObservation, CounterfactualSignal,
    InterventionCounterfactual, RiskModelV1, RiskTrajectoryBuilder, ThresholdEvaluation,
};
pub use canonical::{canonical_json, fingerprint, fingerprint_hex, FINGERPRINT_SEED};
pub use telemetry::{init_tracing, LogFormat};

/// Schema version for all serialized kernel artifacts.
/// Increment on breaking changes to any schema type.
pub const AUDIT_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default risk model version identifier.
pub const DEFAULT_RISK_MODEL_VERSION: &str = "risk_model_v1";
