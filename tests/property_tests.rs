//! Property-based tests for perf-checkpoint
//!
//! - Statistics invariants over arbitrary sample sets
//! - Timer elapsed-time accounting under arbitrary step delays
//! - Ranking order of aggregated checkpoints

use std::sync::Arc;

use chrono::Utc;
use perf_checkpoint::analysis::aggregate;
use perf_checkpoint::stats::AggregateStatistics;
use perf_checkpoint::timer::{CheckpointTimer, ManualClock};
use perf_checkpoint::{Checkpoint, RunRecord};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_samples() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.0f64..1000.0, 1..64)
}

/// Step delays in whole microseconds so ManualClock stays exact.
fn arb_delays() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0u64..2_000_000, 1..20)
}

fn arb_records() -> impl Strategy<Value = Vec<Vec<(usize, f64)>>> {
    proptest::collection::vec(
        proptest::collection::vec((0usize..6, 0.0f64..10.0), 1..6),
        1..12,
    )
}

fn build_record(index: usize, steps: &[(usize, f64)]) -> RunRecord {
    let mut elapsed = 0.0;
    let mut builder = RunRecord::builder(format!("run_{index}"), format!("task_{index}"));
    for (step, since_last) in steps {
        elapsed += since_last;
        builder = builder.checkpoint(
            format!("step_{step}"),
            Checkpoint {
                time_since_last: *since_last,
                total_elapsed: elapsed,
                timestamp: Utc::now(),
                message: None,
            },
        );
    }
    builder.total_execution_time(elapsed).build()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: min <= median <= max and min <= mean <= max
    #[test]
    fn prop_statistics_are_ordered(samples in arb_samples()) {
        let stats = AggregateStatistics::from_samples(&samples);
        let tol = 1e-9 * stats.max.max(1.0);

        prop_assert_eq!(stats.count, samples.len());
        prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
        prop_assert!(stats.mean >= stats.min - tol && stats.mean <= stats.max + tol);
        prop_assert!(stats.std_dev >= 0.0);
        prop_assert!(!stats.std_dev.is_nan());
    }

    /// Property: sum equals count * mean
    #[test]
    fn prop_statistics_sum_matches_mean(samples in arb_samples()) {
        let stats = AggregateStatistics::from_samples(&samples);
        #[allow(clippy::cast_precision_loss)]
        let expected = stats.mean * stats.count as f64;
        prop_assert!((stats.sum - expected).abs() <= 1e-6 * stats.sum.max(1.0));
    }

    /// Property: constant samples have zero spread
    #[test]
    fn prop_constant_samples_have_zero_std_dev(value in 0.0f64..100.0, n in 1usize..30) {
        let stats = AggregateStatistics::from_samples(&vec![value; n]);
        prop_assert!(stats.std_dev.abs() < 1e-9);
        prop_assert!((stats.median - value).abs() < 1e-12);
    }

    /// Property: total_elapsed is the running sum of delays and never decreases
    #[test]
    fn prop_timer_totals_are_cumulative(delays in arb_delays()) {
        let clock = Arc::new(ManualClock::new());
        let timer = CheckpointTimer::in_memory("prop").with_clock(clock.clone());
        timer.start("prop_run");

        let mut expected_micros = 0u64;
        for (i, micros) in delays.iter().enumerate() {
            clock.advance(std::time::Duration::from_micros(*micros));
            expected_micros += micros;
            timer.checkpoint(&format!("c{i}"), None);
        }

        let summary = timer.summary();
        prop_assert_eq!(summary.checkpoint_count, delays.len());

        let mut previous = 0.0;
        for cp in summary.checkpoints.values() {
            prop_assert!(cp.total_elapsed >= previous);
            prop_assert!((cp.time_since_last - (cp.total_elapsed - previous)).abs() < 1e-9);
            previous = cp.total_elapsed;
        }
        #[allow(clippy::cast_precision_loss)]
        let expected = expected_micros as f64 / 1e6;
        prop_assert!((previous - expected).abs() < 1e-9);
    }

    /// Property: ranking is ascending by mean cumulative time and covers every checkpoint
    #[test]
    fn prop_ranking_is_sorted(runs in arb_records()) {
        let records: Vec<RunRecord> = runs
            .iter()
            .enumerate()
            .map(|(i, steps)| build_record(i, steps))
            .collect();
        let result = aggregate(&records);

        prop_assert_eq!(result.total_executions, records.len());
        let ranking = &result.summary.checkpoints_summary;
        prop_assert_eq!(ranking.len(), result.checkpoint_statistics.len());
        prop_assert!(ranking
            .windows(2)
            .all(|w| w[0].avg_total_elapsed <= w[1].avg_total_elapsed));
    }
}
