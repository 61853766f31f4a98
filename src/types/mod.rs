//! Core types for the audit kernel.

pub mod envelope;
pub mod governance;
pub mod frame;
pub mod risk;
pub mod threshold;

pub use envelope::{
    AnalyticsEnvelope, EnvelopeEvent, EnvelopeMetadata, Provenance, SimcityMetadata, Timebase,
    domain_of, SIMCITY_SOURCE,
};
pub use governance::{
    DeprecationPolicy, DomainContract, DomainRegistry, DomainRegistryEntry, EvolutionFlags,
    GovernanceLookup, GovernanceSnapshot, RegistryDocument, SunsetCutoff,
};
pub use frame::{
    AuditFrame, AuditTimeline, RegistryRef, SourceCounts, SyntheticContext, TrustSafetySnapshot,
};
pub use risk::{
    DerivedFrom, RiskConfidence, RiskDimension, RiskMetric, RiskModelRef, RiskStateSnapshot,
    RiskTrajectory, RiskTrend,
};
pub use threshold::{
    Comparator, InterventionClass, InterventionDecision, InterventionJustification,
    ThresholdCrossing, TrustSafetyThreshold,
};
