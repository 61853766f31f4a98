//! Integration tests for risk trajectories, threshold justification and
//! counterfactual analysis.

use audit_trust_kernel::{
    analyze_counterfactual, build_audit_timeline, build_risk_trajectory, evaluate_thresholds,
    AnalyticsEnvelope, AuditTimeline, Comparator, CounterfactualInput, CounterfactualSignal,
    DomainRegistry, DomainRegistryEntry, InterventionClass, InterventionDecision, RiskConfidence,
    RiskDimension, RiskModelV1, RiskTrajectoryBuilder, RiskTrend, SimcityMetadata,
    TimelineOptions, TrustSafetyThreshold,
};

const BASE: i64 = 1_700_000_000_000;
const EPS: f64 = 1e-9;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn registry() -> DomainRegistry {
    DomainRegistry::from_entries([
        DomainRegistryEntry::new("booking", "1.0.0"),
        DomainRegistryEntry::new("provider", "1.0.0"),
        DomainRegistryEntry::new("anomaly", "1.0.0"),
    ])
}

fn build(id: &str, envelopes: &[AnalyticsEnvelope]) -> AuditTimeline {
    build_audit_timeline(envelopes, &registry(), &TimelineOptions::with_id(id))
        .expect("timeline builds")
}

fn cancellation_spike(n: usize) -> Vec<AnalyticsEnvelope> {
    (0..n)
        .map(|i| {
            AnalyticsEnvelope::new(
                format!("cancel-{i}"),
                BASE + i as i64 * 1_000,
                i as u64,
                "web",
                "booking.cancelled",
            )
        })
        .collect()
}

fn no_show_threshold(contract_version: &str) -> TrustSafetyThreshold {
    TrustSafetyThreshold::new(
        "booking-no-show",
        "booking",
        RiskDimension::NoShowHazard,
        Comparator::Gte,
        0.6,
        contract_version,
        "No-show hazard spike",
        InterventionClass::Throttle,
    )
    .with_description("Throttle new bookings for the affected provider cohort")
}

// ─────────────────────────────────────────────────────────────────────────────
// Risk Trajectory
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cancellation_spike_drives_no_show_hazard() {
    let timeline = build("spike", &cancellation_spike(5));
    let trajectory = build_risk_trajectory(&timeline, None);

    let last = trajectory.latest().expect("has snapshots");
    assert!(last.value(RiskDimension::NoShowHazard) >= 0.9);
    assert!(last.value(RiskDimension::ProviderReliability) <= 0.42 + EPS);
    assert_eq!(
        last.metric(RiskDimension::ProviderReliability).unwrap().trend,
        RiskTrend::Down
    );
}

#[test]
fn test_trajectory_metadata() {
    let timeline = build("meta", &cancellation_spike(2));
    let trajectory = build_risk_trajectory(&timeline, None);

    assert_eq!(trajectory.id, "risk-trajectory:meta");
    assert_eq!(trajectory.timeline_id, "meta");
    assert_eq!(trajectory.started_at, Some(BASE));
    assert_eq!(trajectory.ended_at, Some(BASE + 1_000));
    assert_eq!(trajectory.derived_from.frame_ids, vec!["cancel-0", "cancel-1"]);
    assert_eq!(trajectory.derived_from.timeline_started_at, Some(BASE));
    assert!(trajectory.warnings.is_empty());
    assert!(trajectory.replay_compatible);
    assert_eq!(trajectory.model.params_hash, RiskModelV1::default().params_hash());
}

#[test]
fn test_synthetic_frames_lower_confidence() {
    let envelope = AnalyticsEnvelope::new("sim", BASE, 0, "simcity", "booking.cancelled")
        .with_simcity(SimcityMetadata {
            synthetic: true,
            trust_safety_signals: vec!["fraud-risk".into(), "late_cancel".into(), "spam".into()],
            ..Default::default()
        });
    let timeline = build("sim", &[envelope]);
    let trajectory = build_risk_trajectory(&timeline, None);
    let snapshot = &trajectory.snapshots[0];

    assert_eq!(snapshot.signals.len(), 4);
    assert_eq!(snapshot.confidence(), RiskConfidence::Medium);
    assert!(snapshot
        .assumptions
        .iter()
        .any(|a| a.starts_with("Synthetic provenance")));
    assert!(snapshot.signals.contains(&"fraud-risk".to_string()));
}

#[test]
fn test_trajectory_values_stay_bounded() {
    let mut envelopes = Vec::new();
    for i in 0..40u64 {
        let event_type = match i % 4 {
            0 => "booking.cancelled",
            1 => "anomaly.detected",
            2 => "provider.updated",
            _ => "booking.created",
        };
        envelopes.push(
            AnalyticsEnvelope::new(format!("e{i}"), BASE + i as i64, i, "web", event_type)
                .with_severity("critical")
                .with_latency(950.0)
                .with_trust_safety_signals(["chargeback", "spam", "no_show", "reliable"]),
        );
    }
    let timeline = build("bounded", &envelopes);
    let trajectory = build_risk_trajectory(&timeline, None);

    for snapshot in &trajectory.snapshots {
        for metric in &snapshot.metrics {
            assert!((0.0..=1.0).contains(&metric.value), "{metric:?}");
        }
    }
}

#[test]
fn test_custom_model_changes_outcome() {
    let mut model = RiskModelV1::default();
    model.events.remove("booking.cancelled");
    let timeline = build("custom", &cancellation_spike(3));

    let trajectory = RiskTrajectoryBuilder::new(model).build(&timeline, Some("custom-rt"));
    let last = trajectory.latest().expect("has snapshots");
    assert!((last.value(RiskDimension::NoShowHazard) - 0.05).abs() < EPS);
    assert_ne!(trajectory.model.params_hash, RiskModelV1::default().params_hash());
}

// ─────────────────────────────────────────────────────────────────────────────
// Thresholds
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_threshold_justified_once() {
    let timeline = build("spike", &cancellation_spike(5));
    let trajectory = build_risk_trajectory(&timeline, None);
    let registry = registry();

    let evaluation =
        evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], Some(&registry));

    assert_eq!(evaluation.crossings.len(), 5);
    assert_eq!(evaluation.justifications.len(), 1);

    let justification = &evaluation.justifications[0];
    // 0.30, 0.55, 0.80: first crossing of 0.6 is the third cancellation.
    assert_eq!(justification.frame_id, "cancel-2");
    assert_eq!(justification.decision, InterventionDecision::Justified);
    assert_eq!(justification.intervention_class, InterventionClass::Throttle);
    assert!(justification.why_now.contains(">="));
    assert!(justification.why_not_earlier.contains("0.550"));
    assert!(justification.why_this_intervention.contains("No-show hazard spike"));
    assert!(justification.why_this_intervention.contains("throttle"));
    assert_eq!(justification.id, format!("booking-no-show:{}", justification.snapshot_id));
}

#[test]
fn test_contract_mismatch_blocks_justification() {
    let timeline = build("spike", &cancellation_spike(5));
    let trajectory = build_risk_trajectory(&timeline, None);
    let registry = registry();

    let evaluation =
        evaluate_thresholds(&trajectory, &[no_show_threshold("0.9.0")], Some(&registry));

    let justification = evaluation
        .justification("booking-no-show")
        .expect("threshold crossed");
    assert_eq!(justification.decision, InterventionDecision::Blocked);
    assert!(justification
        .contracts_referenced
        .contains(&"booking@0.9.0".to_string()));
    assert!(justification
        .contracts_referenced
        .contains(&"booking@1.0.0".to_string()));
}

#[test]
fn test_domain_scheduled_for_sunset_blocks() {
    let registry = DomainRegistry::from_entries([
        DomainRegistryEntry::new("booking", "1.0.0").deprecated(Some("2099-12-31")),
    ]);
    let timeline = build_audit_timeline(
        &cancellation_spike(4),
        &registry,
        &TimelineOptions::with_id("sunset"),
    )
    .expect("future sunset still builds");
    let trajectory = build_risk_trajectory(&timeline, None);

    // No registry passed: the snapshot's own governance entry is consulted.
    let evaluation = evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], None);
    let justification = &evaluation.justifications[0];
    assert_eq!(justification.decision, InterventionDecision::Blocked);
    assert!(justification
        .assumptions
        .iter()
        .any(|a| a.contains("marked for deprecation")));
}

#[test]
fn test_evaluation_serializes() {
    let timeline = build("spike", &cancellation_spike(3));
    let trajectory = build_risk_trajectory(&timeline, None);
    let evaluation = evaluate_thresholds(&trajectory, &[no_show_threshold("1.0.0")], None);

    let value = serde_json::to_value(&evaluation).expect("evaluation serializes");
    assert_eq!(value["justifications"][0]["decision"], "justified");
    assert_eq!(value["justifications"][0]["interventionClass"], "throttle");
    assert_eq!(value["crossings"][0]["dimension"], "noShowHazard");
    assert_eq!(value["crossings"][0]["comparator"], "gte");
}

// ─────────────────────────────────────────────────────────────────────────────
// Counterfactual
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_counterfactual_no_op() {
    let timeline = build("spike", &cancellation_spike(3));
    let trajectory = build_risk_trajectory(&timeline, None);
    let input = CounterfactualInput::new(&timeline, &trajectory);

    let result = analyze_counterfactual(input, input);

    assert_eq!(result.delta.risk, 0.0);
    assert_eq!(result.delta.cancellations, 0);
    assert_eq!(result.delta.anomalies, 0);
    let names: Vec<&str> = result.signals.iter().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["RISK_STABLE", "CANCELLATIONS_STABLE", "ANOMALIES_STABLE"]);
    assert!(result.replay_compatible);
}

#[test]
fn test_counterfactual_intervention_improves_risk() {
    let spike = build("spike", &cancellation_spike(4));
    let spike_rt = build_risk_trajectory(&spike, None);

    let calm_envelopes: Vec<AnalyticsEnvelope> = (0..4)
        .map(|i| {
            AnalyticsEnvelope::new(
                format!("calm-{i}"),
                BASE + i * 1_000,
                i as u64,
                "simcity",
                "booking.created",
            )
        })
        .collect();
    let calm = build("calm", &calm_envelopes);
    let calm_rt = build_risk_trajectory(&calm, None);

    let result = analyze_counterfactual(
        CounterfactualInput::new(&spike, &spike_rt).labeled("observed"),
        CounterfactualInput::new(&calm, &calm_rt).labeled("throttled"),
    );

    assert!(result.delta.risk < 0.0);
    assert_eq!(result.delta.cancellations, -4);
    assert_eq!(result.delta.synthetic_share, Some(1.0));
    assert_eq!(result.delta.latency_p95_ms, None);
    assert_eq!(
        result.signals,
        vec![
            CounterfactualSignal::RiskImproved,
            CounterfactualSignal::CancellationsDown,
            CounterfactualSignal::AnomaliesStable
        ]
    );
    assert!(result.assumptions.iter().any(|a| a.contains("observed")));
    assert!(result.assumptions.iter().any(|a| a.contains("throttled")));

    let value = serde_json::to_value(&result).expect("counterfactual serializes");
    assert_eq!(value["signals"][0], "RISK_IMPROVED");
    assert_eq!(value["replayCompatible"], true);
}
