//! Performance benchmarks for timeline construction, replay and risk derivation.
//!
//! Run with: `cargo bench --bench replay`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Timeline build | Linear in envelopes | Registry lookup per envelope |
//! | Jump to time | Logarithmic | Binary search over timestamps |
//! | Full replay | Linear in frames | Fold from the start |
//! | Shared replay | Linear scaling | Independent cursors over one timeline |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

use audit_trust_kernel::{
    build_audit_timeline, build_risk_trajectory, create_cursor, jump_to_time,
    replay_deterministically, replay_next, AnalyticsEnvelope, AuditTimeline, DomainRegistry,
    DomainRegistryEntry, TimelineOptions,
};

const BASE: i64 = 1_700_000_000_000;

const EVENT_TYPES: &[&str] = &[
    "booking.created",
    "booking.created",
    "booking.updated",
    "booking.cancelled",
    "provider.updated",
    "anomaly.detected",
];

fn registry() -> DomainRegistry {
    DomainRegistry::from_entries(
        ["booking", "provider", "anomaly"]
            .into_iter()
            .map(|domain| DomainRegistryEntry::new(domain, "1.0.0")),
    )
}

/// Create an ordered envelope stream.
fn make_envelopes(count: usize) -> Vec<AnalyticsEnvelope> {
    (0..count)
        .map(|i| {
            let source = if i % 5 == 0 { "simcity" } else { "web" };
            let mut envelope = AnalyticsEnvelope::new(
                format!("env-{i}"),
                BASE + i as i64 * 10,
                i as u64,
                source,
                EVENT_TYPES[i % EVENT_TYPES.len()],
            )
            .with_latency((i % 1_000) as f64);
            if i % 7 == 0 {
                envelope = envelope.with_trust_safety_signals(["fraud-risk", "spam"]);
            }
            envelope
        })
        .collect()
}

fn make_timeline(count: usize) -> AuditTimeline {
    build_audit_timeline(
        &make_envelopes(count),
        &registry(),
        &TimelineOptions::with_id("bench"),
    )
    .expect("bench stream is ordered and governed")
}

fn bench_timeline_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_build");
    let registry = registry();
    let options = TimelineOptions::default();

    for count in [100usize, 1_000, 10_000] {
        let envelopes = make_envelopes(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &envelopes, |b, envelopes| {
            b.iter(|| build_audit_timeline(black_box(envelopes), &registry, &options))
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");

    for count in [100usize, 1_000, 10_000] {
        let timeline = make_timeline(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("deterministic", count), &timeline, |b, timeline| {
            b.iter(|| replay_deterministically(black_box(timeline)))
        });

        let midpoint = BASE + count as i64 * 5;
        group.bench_with_input(BenchmarkId::new("jump_to_time", count), &timeline, |b, timeline| {
            b.iter(|| jump_to_time(black_box(timeline), black_box(midpoint)))
        });
    }

    group.finish();
}

fn bench_shared_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_replay");
    let timeline = Arc::new(make_timeline(1_000));

    for threads in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let timeline = Arc::clone(&timeline);
                        thread::spawn(move || {
                            let start = (t * 97) % timeline.len();
                            let mut cursor = create_cursor(&timeline, start);
                            for _ in 0..10 {
                                cursor = replay_next(&timeline, &cursor).cursor;
                            }
                            cursor.position
                        })
                    })
                    .collect();
                for handle in handles {
                    black_box(handle.join().expect("replay thread"));
                }
            })
        });
    }

    group.finish();
}

fn bench_trajectory(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_trajectory");

    for count in [100usize, 1_000, 10_000] {
        let timeline = make_timeline(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &timeline, |b, timeline| {
            b.iter(|| build_risk_trajectory(black_box(timeline), None))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_timeline_build,
    bench_replay,
    bench_shared_replay,
    bench_trajectory,
);
criterion_main!(benches);
