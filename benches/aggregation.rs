//! Aggregation benchmarks
//!
//! Measures how run-record aggregation scales with the number of records
//! and checkpoints per record.
//!
//! Run with: cargo bench --bench aggregation

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perf_checkpoint::analysis::aggregate;
use perf_checkpoint::stats::AggregateStatistics;
use perf_checkpoint::{Checkpoint, RunRecord};

const CHECKPOINTS_PER_RUN: usize = 10;

#[allow(clippy::cast_precision_loss)]
fn synthetic_records(runs: usize) -> Vec<RunRecord> {
    (0..runs)
        .map(|run| {
            let mut elapsed = 0.0;
            let mut builder = RunRecord::builder(format!("bench_{run}"), format!("task_{run}"));
            for step in 0..CHECKPOINTS_PER_RUN {
                let since_last = 0.01 * ((run * 7 + step * 13) % 50 + 1) as f64;
                elapsed += since_last;
                builder = builder.checkpoint(
                    format!("step_{step}"),
                    Checkpoint {
                        time_since_last: since_last,
                        total_elapsed: elapsed,
                        timestamp: Utc::now(),
                        message: None,
                    },
                );
            }
            builder.total_execution_time(elapsed).build()
        })
        .collect()
}

/// Benchmark full aggregation over N records
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_records");

    for runs in [10, 100, 1_000] {
        let records = synthetic_records(runs);
        group.bench_with_input(BenchmarkId::from_parameter(runs), &records, |b, records| {
            b.iter(|| aggregate(black_box(records)));
        });
    }

    group.finish();
}

/// Benchmark descriptive statistics on raw samples
#[allow(clippy::cast_precision_loss)]
fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_statistics");

    for size in [100, 10_000] {
        let samples: Vec<f64> = (0..size).map(|i| ((i * 31) % 997) as f64 / 10.0).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &samples, |b, samples| {
            b.iter(|| AggregateStatistics::from_samples(black_box(samples)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_statistics);
criterion_main!(benches);
