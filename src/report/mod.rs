//! Report rendering
//!
//! Pure formatting of an [`AnalysisResult`]: a plain-text report for
//! terminals and log files, an HTML page for sharing, and SVG charts via the
//! [`ChartRenderer`] strategy.

mod chart;
mod html;

pub use chart::{ChartRenderer, NoopChartRenderer, SvgChartRenderer};
pub use html::render_html_with;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::stats::cmp_f64;

/// Message rendered in place of a report when there is nothing to show.
pub const NO_DATA_MESSAGE: &str = "No analysis data available";

/// Default directory for rendered charts.
pub const DEFAULT_CHART_DIR: &str = "performance_charts";

const RULE_WIDTH: usize = 80;

/// Number of slowest checkpoints always listed in suggestions.
pub const SUGGESTION_TOP_N: usize = 3;

/// Mean step times (seconds) above which a checkpoint is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    /// Above this: improvement recommended.
    pub warn: f64,
    /// Above this: needs improvement.
    pub critical: f64,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            warn: 2.0,
            critical: 5.0,
        }
    }
}

/// Verdict for one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionLevel {
    /// Below the warn threshold.
    Good,
    /// Above warn.
    ImprovementRecommended,
    /// Above critical.
    NeedsImprovement,
}

impl SuggestionLevel {
    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::ImprovementRecommended => "improvement recommended",
            Self::NeedsImprovement => "needs improvement",
        }
    }

    fn classify(mean: f64, thresholds: SuggestionThresholds) -> Self {
        if mean > thresholds.critical {
            Self::NeedsImprovement
        } else if mean > thresholds.warn {
            Self::ImprovementRecommended
        } else {
            Self::Good
        }
    }
}

/// A flagged checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Checkpoint name.
    pub name: String,
    /// Mean seconds since the previous checkpoint.
    pub mean_time_since_last: f64,
    /// Verdict.
    pub level: SuggestionLevel,
}

/// Slowest checkpoints by mean step time.
///
/// Lists the [`SUGGESTION_TOP_N`] slowest checkpoints plus any other
/// checkpoint above `thresholds.warn`, slowest first.
#[must_use]
pub fn suggestions(result: &AnalysisResult, thresholds: SuggestionThresholds) -> Vec<Suggestion> {
    let mut ranked: Vec<Suggestion> = result
        .checkpoint_statistics
        .iter()
        .map(|(name, stats)| Suggestion {
            name: name.clone(),
            mean_time_since_last: stats.time_since_last.mean,
            level: SuggestionLevel::classify(stats.time_since_last.mean, thresholds),
        })
        .collect();
    ranked.sort_by(|a, b| {
        cmp_f64(b.mean_time_since_last, a.mean_time_since_last).then_with(|| a.name.cmp(&b.name))
    });

    ranked
        .into_iter()
        .enumerate()
        .take_while(|(i, s)| *i < SUGGESTION_TOP_N || s.level != SuggestionLevel::Good)
        .map(|(_, s)| s)
        .collect()
}

/// Plain-text report, rendered through [`fmt::Display`].
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a>(pub &'a AnalysisResult);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        if result.is_empty() {
            return f.write_str(NO_DATA_MESSAGE);
        }

        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "Parallel execution performance report")?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Analyzed at: {}",
            result.analysis_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "Executions: {}", result.total_executions)?;

        let overall = &result.overall_statistics;
        if overall.count > 0 {
            writeln!(f, "\nOverall execution time:")?;
            writeln!(f, "  mean:    {:.3}s", overall.mean)?;
            writeln!(f, "  min:     {:.3}s", overall.min)?;
            writeln!(f, "  max:     {:.3}s", overall.max)?;
            writeln!(f, "  median:  {:.3}s", overall.median)?;
            writeln!(f, "  std dev: {:.3}s", overall.std_dev)?;
            writeln!(f, "  total:   {:.3}s", overall.sum)?;
        }

        let ranking = &result.summary.checkpoints_summary;
        if !ranking.is_empty() {
            writeln!(f, "\nCheckpoint ranking (by mean cumulative time):")?;
            for (i, rank) in ranking.iter().enumerate() {
                writeln!(
                    f,
                    "  {:2}. {:<30} mean: {:.3}s (since last: {:.3}s) runs: {}",
                    i + 1,
                    rank.name,
                    rank.avg_total_elapsed,
                    rank.avg_time_since_last,
                    rank.count
                )?;
            }
        }

        if !result.checkpoint_statistics.is_empty() {
            writeln!(f, "\nCheckpoint details:")?;
            for (name, stats) in &result.checkpoint_statistics {
                writeln!(f, "\n  {name}")?;
                writeln!(f, "     runs: {}", stats.count)?;
                for (label, s) in [
                    ("since last", &stats.time_since_last),
                    ("cumulative", &stats.total_elapsed),
                ] {
                    if s.count == 0 {
                        continue;
                    }
                    writeln!(f, "     {label}:")?;
                    writeln!(f, "       mean:    {:.3}s", s.mean)?;
                    writeln!(f, "       range:   {:.3}s to {:.3}s", s.min, s.max)?;
                    writeln!(f, "       std dev: {:.3}s", s.std_dev)?;
                }
            }
        }

        if !result.execution_details.is_empty() {
            writeln!(f, "\nExecution details:")?;
            for (i, detail) in result.execution_details.iter().enumerate() {
                writeln!(
                    f,
                    "  {:2}. test: {:<20} task: {:<15} time: {:.3}s",
                    i + 1,
                    detail.test_name,
                    detail.task_id,
                    detail.total_time
                )?;
            }
        }

        write!(f, "\n{rule}")
    }
}

/// Render the plain-text report.
#[must_use]
pub fn render_text(result: &AnalysisResult) -> String {
    TextReport(result).to_string()
}

/// Render the HTML report with default thresholds.
#[must_use]
pub fn render_html(result: &AnalysisResult) -> String {
    render_html_with(result, SuggestionThresholds::default())
}
