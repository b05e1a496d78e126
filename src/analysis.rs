//! Statistics Aggregator - cross-run analysis of persisted records
//!
//! Reads every record matching a filename pattern, groups checkpoint
//! samples by name and computes [`AggregateStatistics`] for each group and
//! for the overall run times.
//!
//! ## Example
//!
//! ```rust,no_run
//! use perf_checkpoint::analysis::StatisticsAggregator;
//! use perf_checkpoint::report::render_text;
//!
//! let aggregator = StatisticsAggregator::new();
//! let result = aggregator.analyze_dir("performance_logs");
//! println!("{}", render_text(&result));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::emitter::RECORD_PATTERN;
use crate::record::RunRecord;
use crate::report::render_text;
use crate::stats::{cmp_f64, AggregateStatistics};
use crate::{Error, Result};

/// One run as listed in the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetail {
    /// Run name.
    pub test_name: String,
    /// Emitting task.
    pub task_id: String,
    /// Record timestamp.
    pub timestamp: DateTime<Utc>,
    /// Total execution time in seconds.
    pub total_time: f64,
}

/// One observation of a checkpoint in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSample {
    /// Seconds since the previous checkpoint.
    pub time_since_last: f64,
    /// Seconds since run start.
    pub total_elapsed: f64,
    /// Task the sample came from.
    pub task_id: String,
    /// When the checkpoint was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Statistics for one checkpoint name across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointStatistics {
    /// Number of runs containing the checkpoint.
    pub count: usize,
    /// Statistics over `time_since_last`.
    pub time_since_last: AggregateStatistics,
    /// Statistics over `total_elapsed`.
    pub total_elapsed: AggregateStatistics,
    /// Raw samples.
    pub details: Vec<CheckpointSample>,
}

/// Ranking entry for one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRank {
    /// Checkpoint name.
    pub name: String,
    /// Mean seconds since the previous checkpoint.
    pub avg_time_since_last: f64,
    /// Mean seconds since run start.
    pub avg_total_elapsed: f64,
    /// Number of samples.
    pub count: usize,
}

/// Headline numbers of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Mean run time in seconds.
    pub avg_total_execution_time: f64,
    /// Number of distinct checkpoint names.
    pub total_checkpoints: usize,
    /// Checkpoints ranked ascending by mean `total_elapsed`.
    pub checkpoints_summary: Vec<CheckpointRank>,
}

/// Output of [`StatisticsAggregator::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// When the analysis ran.
    pub analysis_timestamp: DateTime<Utc>,
    /// Number of run records analyzed.
    pub total_executions: usize,
    /// Per-run listing.
    pub execution_details: Vec<ExecutionDetail>,
    /// Statistics over run totals.
    pub overall_statistics: AggregateStatistics,
    /// Per-checkpoint statistics in first-seen order.
    pub checkpoint_statistics: IndexMap<String, CheckpointStatistics>,
    /// Headline numbers and ranking.
    pub summary: AnalysisSummary,
}

impl AnalysisResult {
    /// Result describing zero runs.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            analysis_timestamp: Utc::now(),
            total_executions: 0,
            execution_details: Vec::new(),
            overall_statistics: AggregateStatistics::default(),
            checkpoint_statistics: IndexMap::new(),
            summary: AnalysisSummary::default(),
        }
    }

    /// True when no runs were analyzed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_executions == 0
    }
}

/// Loads run records and aggregates them.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    matcher: GlobMatcher,
}

impl StatisticsAggregator {
    /// Aggregator matching [`RECORD_PATTERN`].
    ///
    /// # Panics
    ///
    /// Does not panic: [`RECORD_PATTERN`] is a valid glob.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: compile_pattern(RECORD_PATTERN).expect("RECORD_PATTERN is a valid glob"),
        }
    }

    /// Aggregator matching a custom filename glob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            matcher: compile_pattern(pattern)?,
        })
    }

    /// Load every matching record in `dir`, skipping unreadable ones.
    ///
    /// A missing directory yields no records. Records come back in filename
    /// order.
    #[must_use]
    pub fn load_records(&self, dir: impl AsRef<Path>) -> Vec<RunRecord> {
        let dir = dir.as_ref();
        let paths = match self.matching_files(dir) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "cannot read record directory");
                return Vec::new();
            }
        };

        let records: Vec<RunRecord> = paths
            .iter()
            .filter_map(|path| match read_record(path) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable run record");
                    None
                }
            })
            .collect();

        info!(dir = %dir.display(), loaded = records.len(), matched = paths.len(), "loaded run records");
        records
    }

    /// Delete every matching record in `dir`; returns how many went.
    ///
    /// A missing directory clears nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be listed or a record
    /// cannot be removed.
    pub fn clear_records(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let paths = match self.matching_files(dir) {
            Ok(paths) => paths,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        for path in &paths {
            fs::remove_file(path)?;
        }
        info!(dir = %dir.display(), removed = paths.len(), "cleared run records");
        Ok(paths.len())
    }

    /// Regular files in `dir` whose names match, sorted by filename.
    fn matching_files(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| self.matcher.is_match(name))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Aggregate `records` into an [`AnalysisResult`].
    #[must_use]
    pub fn aggregate(&self, records: &[RunRecord]) -> AnalysisResult {
        aggregate(records)
    }

    /// Load and aggregate in one step.
    #[must_use]
    pub fn analyze_dir(&self, dir: impl AsRef<Path>) -> AnalysisResult {
        aggregate(&self.load_records(dir))
    }
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|err| Error::InvalidPattern(format!("{pattern}: {err}")))
}

fn read_record(path: &Path) -> Result<RunRecord> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load records from `dir` whose filenames match `pattern`.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if `pattern` is not a valid glob;
/// unreadable records are skipped, not reported.
pub fn load_records(dir: impl AsRef<Path>, pattern: &str) -> Result<Vec<RunRecord>> {
    Ok(StatisticsAggregator::with_pattern(pattern)?.load_records(dir))
}

/// Aggregate run records.
///
/// Empty input gives [`AnalysisResult::empty`].
#[must_use]
pub fn aggregate(records: &[RunRecord]) -> AnalysisResult {
    let mut result = AnalysisResult::empty();
    if records.is_empty() {
        return result;
    }

    let mut totals = Vec::with_capacity(records.len());
    let mut samples: IndexMap<String, Vec<CheckpointSample>> = IndexMap::new();

    for record in records {
        totals.push(record.total_execution_time());
        result.execution_details.push(ExecutionDetail {
            test_name: record.test_name().to_string(),
            task_id: record.task_id().to_string(),
            timestamp: record.timestamp(),
            total_time: record.total_execution_time(),
        });

        for (name, checkpoint) in record.checkpoints() {
            samples.entry(name.clone()).or_default().push(CheckpointSample {
                time_since_last: checkpoint.time_since_last,
                total_elapsed: checkpoint.total_elapsed,
                task_id: record.task_id().to_string(),
                timestamp: checkpoint.timestamp,
            });
        }
    }

    let mut ranking = Vec::with_capacity(samples.len());
    for (name, details) in samples {
        let since_last: Vec<f64> = details.iter().map(|s| s.time_since_last).collect();
        let elapsed: Vec<f64> = details.iter().map(|s| s.total_elapsed).collect();
        let stats = CheckpointStatistics {
            count: details.len(),
            time_since_last: AggregateStatistics::from_samples(&since_last),
            total_elapsed: AggregateStatistics::from_samples(&elapsed),
            details,
        };

        ranking.push(CheckpointRank {
            name: name.clone(),
            avg_time_since_last: stats.time_since_last.mean,
            avg_total_elapsed: stats.total_elapsed.mean,
            count: stats.count,
        });
        result.checkpoint_statistics.insert(name, stats);
    }

    ranking.sort_by(|a, b| {
        cmp_f64(a.avg_total_elapsed, b.avg_total_elapsed).then_with(|| a.name.cmp(&b.name))
    });

    result.total_executions = records.len();
    result.overall_statistics = AggregateStatistics::from_samples(&totals);
    result.summary = AnalysisSummary {
        avg_total_execution_time: result.overall_statistics.mean,
        total_checkpoints: result.checkpoint_statistics.len(),
        checkpoints_summary: ranking,
    };
    result
}

/// Write the analysis as JSON and as a text report into `dir`.
///
/// Returns `(json_path, report_path)`.
///
/// # Errors
///
/// Returns an error if the directory or either file cannot be written.
pub fn save_analysis(result: &AnalysisResult, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let json_path = dir.join(format!("parallel_analysis_{stamp}.json"));
    let report_path = dir.join(format!("parallel_report_{stamp}.txt"));

    fs::write(&json_path, serde_json::to_vec_pretty(result)?)?;
    fs::write(&report_path, render_text(result))?;

    info!(
        json = %json_path.display(),
        report = %report_path.display(),
        "analysis saved"
    );
    Ok((json_path, report_path))
}
