//! Integration tests for the audit engine.
//!
//! A baseline run mixes real and simulated booking traffic; a fork of it adds
//! one extra simulated cancellation. Together they exercise timeline
//! construction, replay, diffing and the governance cutoff.

use audit_trust_kernel::{
    build_audit_timeline, create_cursor, diff_timelines, jump_to_event, jump_to_time,
    replay_deterministically, replay_next, AnalyticsEnvelope, AuditTimeline, DomainRegistry,
    DomainRegistryEntry, EnvelopeAdapterV1, EvolutionFlags, ExplanationKind, Provenance,
    SimcityMetadata, TimelineError, TimelineOptions,
};
use serde_json::json;

const BASE: i64 = 1_700_000_000_000;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn registry() -> DomainRegistry {
    DomainRegistry::from_entries([
        DomainRegistryEntry::new("booking", "1.0.0"),
        DomainRegistryEntry::new("provider", "1.0.0"),
    ])
}

fn baseline_envelopes() -> Vec<AnalyticsEnvelope> {
    vec![
        AnalyticsEnvelope::new("real-1", BASE, 0, "web", "booking.created").with_latency(180.0),
        AnalyticsEnvelope::new("sim-1", BASE + 50, 1, "simcity", "booking.cancelled")
            .with_sim_time(10.0)
            .with_simcity(SimcityMetadata {
                synthetic: true,
                run_id: Some("run-baseline".into()),
                scenario_id: Some("scenario-1".into()),
                baseline: Some(true),
                trust_safety_signals: vec!["fraud-risk".into()],
                ..Default::default()
            })
            .with_evolution(EvolutionFlags {
                allow_breaking_changes: false,
                require_migration_plan: true,
                version_upgrade_required: None,
            }),
        AnalyticsEnvelope::new("real-2", BASE + 100, 2, "web", "provider.updated").with_latency(190.0),
    ]
}

fn fork_envelopes() -> Vec<AnalyticsEnvelope> {
    let mut envelopes = baseline_envelopes();
    envelopes.push(
        AnalyticsEnvelope::new("fork-extra", BASE + 150, 3, "simcity", "booking.cancelled")
            .with_simcity(SimcityMetadata {
                synthetic: true,
                run_id: Some("run-fork".into()),
                scenario_id: Some("scenario-1".into()),
                fork_of: Some("run-baseline".into()),
                trust_safety_signals: vec!["fraud-risk".into(), "slo-risk".into()],
                ..Default::default()
            })
            .with_latency(240.0)
            .with_evolution(EvolutionFlags {
                allow_breaking_changes: true,
                require_migration_plan: true,
                version_upgrade_required: Some("2.0.0".into()),
            }),
    );
    envelopes
}

fn baseline() -> AuditTimeline {
    build_audit_timeline(
        &baseline_envelopes(),
        &registry(),
        &TimelineOptions::with_id("baseline"),
    )
    .expect("baseline builds")
}

fn fork() -> AuditTimeline {
    build_audit_timeline(&fork_envelopes(), &registry(), &TimelineOptions::with_id("fork"))
        .expect("fork builds")
}

// ─────────────────────────────────────────────────────────────────────────────
// Timeline Construction
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_timeline_counts_sources() {
    let timeline = baseline();

    assert_eq!(timeline.sources().real, 2);
    assert_eq!(timeline.sources().synthetic, 1);
    assert_eq!(timeline.domains(), &["booking".to_string(), "provider".to_string()]);

    let synthetic = &timeline.frames()[1];
    assert_eq!(synthetic.provenance, Provenance::Synthetic);
    assert!(synthetic.signals().contains(&"fraud-risk".to_string()));
    assert!(synthetic.governance.permitted);
    assert_eq!(synthetic.sim_time, Some(10.0));
}

#[test]
fn test_deprecated_domain_cutoff() {
    let registry = DomainRegistry::from_entries([
        DomainRegistryEntry::new("booking", "0.9.0").deprecated(Some("2024-01-01")),
    ]);
    // 2025-02-01T00:00:00Z
    let late = AnalyticsEnvelope::new("late", 1_738_368_000_000, 0, "web", "booking.created");

    let err = build_audit_timeline(&[late], &registry, &TimelineOptions::default())
        .expect_err("cutoff must reject");

    assert!(matches!(err, TimelineError::GovernanceCutoffViolation { .. }));
    assert!(err.to_string().to_lowercase().contains("cutoff"));
}

#[test]
fn test_out_of_order_input_is_not_repaired() {
    let mut envelopes = baseline_envelopes();
    envelopes.swap(0, 2);

    let err = build_audit_timeline(&envelopes, &registry(), &TimelineOptions::default())
        .expect_err("ordering must reject");
    assert!(matches!(err, TimelineError::OrderingViolation { index: 1, .. }));
}

#[test]
fn test_timeline_from_raw_json() {
    let raw = vec![
        json!({
            "id": "raw-1",
            "timestamp": BASE,
            "timebase": { "logical": 0 },
            "source": "web",
            "event": { "type": "booking.created", "payload": { "bookingId": "b-1" } },
            "metadata": { "latency": { "p95": 210 } }
        }),
        json!({
            "id": "raw-2",
            "timestamp": BASE + 10,
            "timebase": { "logical": 1, "simTime": 3.5 },
            "source": "simcity",
            "event": { "type": "booking.cancelled" },
            "metadata": {
                "simcity": { "runId": "run-a", "trustSafety": { "signals": ["no_show"] } }
            }
        }),
    ];

    let envelopes = EnvelopeAdapterV1::default()
        .normalize_batch(&raw)
        .expect("raw envelopes normalize");
    let timeline = build_audit_timeline(&envelopes, &registry(), &TimelineOptions::default())
        .expect("timeline builds");

    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.frames()[0].latency_ms(), Some(210.0));
    assert_eq!(timeline.frames()[1].provenance, Provenance::Synthetic);
    assert_eq!(timeline.frames()[1].signals(), &["no_show".to_string()]);
    assert_eq!(
        timeline.frames()[1]
            .synthetic_context
            .as_ref()
            .and_then(|c| c.run_id.as_deref()),
        Some("run-a")
    );
}

#[test]
fn test_timeline_serializes_camel_case() {
    let value = serde_json::to_value(baseline()).expect("timeline serializes");

    assert_eq!(value["id"], "baseline");
    assert_eq!(value["startedAt"], BASE);
    assert_eq!(value["sources"]["synthetic"], 1);
    assert_eq!(value["frames"][1]["syntheticContext"]["runId"], "run-baseline");
    assert_eq!(value["frames"][0]["governance"]["permitted"], true);
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_replay_steps_and_jumps() {
    let timeline = baseline();

    let first = replay_next(&timeline, &create_cursor(&timeline, 0));
    assert_eq!(first.frame.map(|f| f.id.as_str()), Some("real-1"));

    let second = replay_next(&timeline, &first.cursor);
    assert_eq!(second.state.count("booking.created"), 1);
    assert_eq!(second.state.synthetic_seen, 1);

    let by_time = jump_to_time(&timeline, BASE + 50);
    assert_eq!(
        replay_next(&timeline, &by_time).frame.map(|f| f.id.as_str()),
        Some("sim-1")
    );

    let by_event = jump_to_event(&timeline, "sim-1");
    let step = replay_next(&timeline, &by_event);
    assert_eq!(step.frame.map(|f| f.domain()), Some("booking"));

    let state = replay_deterministically(&timeline);
    assert_eq!(state.real_seen, 2);
    assert_eq!(state.synthetic_seen, 1);
    assert_eq!(state.last_frame_id.as_deref(), Some("real-2"));
}

#[test]
fn test_replay_is_repeatable() {
    let timeline = baseline();
    assert_eq!(replay_deterministically(&timeline), replay_deterministically(&timeline));

    let rebuilt = baseline();
    assert_eq!(replay_deterministically(&timeline), replay_deterministically(&rebuilt));
}

// ─────────────────────────────────────────────────────────────────────────────
// Diff
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_diff_against_fork() {
    let diff = diff_timelines(&baseline(), &fork());

    assert_eq!(diff.missing_in_baseline, vec!["fork-extra"]);
    assert!(diff.missing_in_comparison.is_empty());
    assert_eq!(diff.metric_divergence["booking.cancelled"], 1);
    assert!(diff
        .trust_safety_changes
        .iter()
        .any(|change| change.contains("slo-risk")));

    let forked = diff.explanations.iter().find(|e| {
        e.synthetic_context
            .as_ref()
            .and_then(|c| c.fork_of.as_deref())
            == Some("run-baseline")
    });
    assert!(forked.is_some());

    let latency = diff.slo_impacts.latency_p95_delta.expect("both sides have latency");
    assert!(latency > 0.0);
    assert_eq!(diff.slo_impacts.cancellation_delta, 1);
}

#[test]
fn test_diff_is_structurally_symmetric() {
    let forward = diff_timelines(&baseline(), &fork());
    let backward = diff_timelines(&fork(), &baseline());

    assert_eq!(forward.missing_in_baseline, backward.missing_in_comparison);
    assert_eq!(forward.missing_in_comparison, backward.missing_in_baseline);
    for (event_type, delta) in &forward.metric_divergence {
        assert_eq!(backward.metric_divergence[event_type], -delta);
    }
    assert!(backward
        .explanations
        .iter()
        .any(|e| e.kind == ExplanationKind::TrustSafetyChange && e.description.contains("Missing")));
}
