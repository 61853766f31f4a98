//! Audit layer: timeline construction, replay and diff.
//!
//! ```text
//! envelopes ──► build_audit_timeline ──► AuditTimeline ──┬──► replay_*
//!                     ▲                                  └──► diff_timelines
//!                     │
//!             GovernanceLookup
//! ```
//!
//! Only the builder can fail. Everything downstream of a built timeline is a
//! total function.

pub mod diff;
pub mod replay;
pub mod stats;
pub mod timeline;

pub use diff::{diff_timelines, DiffExplanation, ExplanationKind, SloImpacts, TimelineDiff};
pub use replay::{
    create_cursor, jump_to_event, jump_to_time, replay_deterministically, replay_next, state_at,
    ReplayCursor, ReplayState, ReplayStep,
};
pub use timeline::{build_audit_timeline, TimelineError, TimelineOptions};
