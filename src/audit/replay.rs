//! Deterministic replay over an audit timeline.
//!
//! Cursors are plain values that remember a position and nothing else. The
//! state at a position is always recomputed as a fold over the frames before
//! it, so two cursors at the same position on the same timeline always see the
//! same state, no matter how they got there.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{AuditFrame, AuditTimeline, Provenance};

/// Position within a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCursor {
    /// Timeline being replayed.
    pub timeline_id: String,
    /// Number of frames already consumed.
    pub position: usize,
    /// Whether every frame has been consumed.
    pub completed: bool,
}

/// Fold of every frame before a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayState {
    /// Number of frames folded.
    pub position: usize,
    /// Occurrences of each event type.
    pub event_counts: BTreeMap<String, u64>,
    /// Synthetic frames folded.
    pub synthetic_seen: u64,
    /// Real frames folded.
    pub real_seen: u64,
    /// Most recent non-empty trust-safety signal set.
    pub last_trust_safety_signals: Option<Vec<String>>,
    /// ID of the last frame folded.
    pub last_frame_id: Option<String>,
}

impl ReplayState {
    /// Occurrences of one event type.
    pub fn count(&self, event_type: &str) -> u64 {
        self.event_counts.get(event_type).copied().unwrap_or(0)
    }

    fn apply(&mut self, frame: &AuditFrame) {
        *self
            .event_counts
            .entry(frame.event_type().to_string())
            .or_insert(0) += 1;

        match frame.provenance {
            Provenance::Synthetic => self.synthetic_seen += 1,
            Provenance::Real => self.real_seen += 1,
        }

        if let Some(trust_safety) = &frame.trust_safety {
            if !trust_safety.signals.is_empty() {
                self.last_trust_safety_signals = Some(trust_safety.signals.clone());
            }
        }

        self.last_frame_id = Some(frame.id.clone());
        self.position += 1;
    }
}

/// Result of advancing a cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep<'a> {
    /// Cursor after the step.
    pub cursor: ReplayCursor,
    /// Frame consumed by the step, `None` once the replay is complete.
    pub frame: Option<&'a AuditFrame>,
    /// State after the step.
    pub state: ReplayState,
}

fn cursor_at(timeline: &AuditTimeline, position: usize) -> ReplayCursor {
    let position = position.min(timeline.len());
    ReplayCursor {
        timeline_id: timeline.id().to_string(),
        position,
        completed: position >= timeline.len(),
    }
}

/// Create a cursor at `start_index`, clamped to the timeline length.
pub fn create_cursor(timeline: &AuditTimeline, start_index: usize) -> ReplayCursor {
    cursor_at(timeline, start_index)
}

/// State after folding the first `position` frames.
pub fn state_at(timeline: &AuditTimeline, position: usize) -> ReplayState {
    let mut state = ReplayState::default();
    for frame in timeline.frames().iter().take(position) {
        state.apply(frame);
    }
    state
}

/// Consume the frame at the cursor.
///
/// On a completed cursor this returns the terminal state with no frame, so
/// calling it repeatedly is harmless.
pub fn replay_next<'a>(timeline: &'a AuditTimeline, cursor: &ReplayCursor) -> ReplayStep<'a> {
    let position = cursor.position.min(timeline.len());

    match timeline.frame(position) {
        Some(frame) => {
            let next = cursor_at(timeline, position + 1);
            let state = state_at(timeline, next.position);
            ReplayStep {
                cursor: next,
                frame: Some(frame),
                state,
            }
        }
        None => ReplayStep {
            cursor: cursor_at(timeline, timeline.len()),
            frame: None,
            state: state_at(timeline, timeline.len()),
        },
    }
}

/// Cursor at the first frame with `timestamp >= ts`.
///
/// Frames are ordered by timestamp, so this is a binary search. If every frame
/// is earlier, the cursor is completed at the end.
pub fn jump_to_time(timeline: &AuditTimeline, ts: i64) -> ReplayCursor {
    let position = timeline.frames().partition_point(|frame| frame.timestamp < ts);
    cursor_at(timeline, position)
}

/// Cursor at the frame with the given ID, or completed at the end if absent.
pub fn jump_to_event(timeline: &AuditTimeline, event_id: &str) -> ReplayCursor {
    let position = timeline
        .frames()
        .iter()
        .position(|frame| frame.id == event_id)
        .unwrap_or(timeline.len());
    cursor_at(timeline, position)
}

/// Fold every frame from the start.
pub fn replay_deterministically(timeline: &AuditTimeline) -> ReplayState {
    state_at(timeline, timeline.len())
}
