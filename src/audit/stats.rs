//! Small aggregate helpers shared by the diff and counterfactual paths.

use std::collections::BTreeMap;

use crate::types::AuditTimeline;

/// Event type of a booking creation.
pub const BOOKING_CREATED: &str = "booking.created";
/// Event type of a booking cancellation.
pub const BOOKING_CANCELLED: &str = "booking.cancelled";
/// Event type of a detected anomaly.
pub const ANOMALY_DETECTED: &str = "anomaly.detected";

/// Nearest-rank 95th percentile.
///
/// Returns `None` for an empty sample so callers never mistake "no data" for 0.
pub fn p95(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (0.95 * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Latency samples carried by the timeline's frames.
pub fn latency_samples(timeline: &AuditTimeline) -> Vec<f64> {
    timeline
        .frames()
        .iter()
        .filter_map(|frame| frame.latency_ms())
        .collect()
}

/// p95 latency across the timeline, `None` if no frame carries a sample.
pub fn latency_p95(timeline: &AuditTimeline) -> Option<f64> {
    p95(&latency_samples(timeline))
}

/// Occurrences of each event type.
pub fn event_counts(timeline: &AuditTimeline) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for frame in timeline.frames() {
        *counts.entry(frame.event_type().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Occurrences of one event type.
pub fn count_events(timeline: &AuditTimeline, event_type: &str) -> i64 {
    timeline
        .frames()
        .iter()
        .filter(|frame| frame.event_type() == event_type)
        .count() as i64
}
