//! Chart rendering strategies
//!
//! Charts are optional. [`NoopChartRenderer`] stands in when charts are not
//! wanted, so callers never branch on whether plotting is available.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::analysis::AnalysisResult;
use crate::Result;

/// Renders charts for an analysis into a directory.
pub trait ChartRenderer: fmt::Debug {
    /// Write charts into `dir` and return the files produced.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` or a chart file cannot be written.
    fn render(&self, result: &AnalysisResult, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Whether this renderer produces any output.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Renderer that skips charts, keeping numeric reports only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChartRenderer;

impl ChartRenderer for NoopChartRenderer {
    fn render(&self, _result: &AnalysisResult, _dir: &Path) -> Result<Vec<PathBuf>> {
        info!("chart rendering disabled, skipping charts");
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Dependency-free SVG charts.
///
/// Produces `checkpoint_means.svg` (mean step time per checkpoint, in
/// ranking order) and `execution_distribution.svg` (histogram of run
/// totals).
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    width: u32,
    bins: usize,
}

/// File name of the per-checkpoint bar chart.
pub const CHECKPOINT_CHART: &str = "checkpoint_means.svg";

/// File name of the run-time histogram.
pub const DISTRIBUTION_CHART: &str = "execution_distribution.svg";

const BAR_HEIGHT: u32 = 22;
const LABEL_WIDTH: u32 = 220;
const MARGIN: u32 = 20;

impl SvgChartRenderer {
    /// Renderer with an 800px canvas and 10 histogram bins.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: 800,
            bins: 10,
        }
    }

    /// Set the canvas width in pixels.
    #[must_use]
    pub const fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the number of histogram bins (at least one).
    #[must_use]
    pub const fn bins(mut self, bins: usize) -> Self {
        self.bins = if bins == 0 { 1 } else { bins };
        self
    }

    fn plot_width(&self) -> f64 {
        f64::from(self.width.saturating_sub(LABEL_WIDTH + 2 * MARGIN).max(1))
    }

    fn checkpoint_chart(&self, result: &AnalysisResult) -> String {
        CheckpointChart {
            renderer: self,
            result,
        }
        .to_string()
    }

    fn distribution_chart(&self, result: &AnalysisResult) -> String {
        DistributionChart {
            renderer: self,
            result,
        }
        .to_string()
    }
}

/// Horizontal bars of mean step time, one row per ranked checkpoint.
struct CheckpointChart<'a> {
    renderer: &'a SvgChartRenderer,
    result: &'a AnalysisResult,
}

impl fmt::Display for CheckpointChart<'_> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranking = &self.result.summary.checkpoints_summary;
        let rows = u32::try_from(ranking.len()).unwrap_or(u32::MAX);
        let height = 2 * MARGIN + BAR_HEIGHT * rows.saturating_add(1);
        let max = ranking
            .iter()
            .map(|r| r.avg_time_since_last)
            .fold(0.0_f64, f64::max);
        let scale = if max > 0.0 {
            self.renderer.plot_width() / max
        } else {
            0.0
        };

        svg_open(f, self.renderer.width, height)?;
        writeln!(
            f,
            r#"<text x="{MARGIN}" y="{}" font-weight="bold">Mean step time per checkpoint (s)</text>"#,
            MARGIN + 12
        )?;
        for (i, rank) in (1_u32..).zip(ranking) {
            let y = MARGIN + BAR_HEIGHT * i;
            let bar = (rank.avg_time_since_last * scale).round().max(0.0) as u32;
            writeln!(
                f,
                r#"<text x="{MARGIN}" y="{}">{}</text>"#,
                y + 15,
                xml_escape(&rank.name)
            )?;
            writeln!(
                f,
                r##"<rect x="{}" y="{}" width="{bar}" height="{}" fill="#4a90d9"/>"##,
                MARGIN + LABEL_WIDTH,
                y + 3,
                BAR_HEIGHT - 6
            )?;
            writeln!(
                f,
                r#"<text x="{}" y="{}">{:.3}</text>"#,
                MARGIN + LABEL_WIDTH + bar + 4,
                y + 15,
                rank.avg_time_since_last
            )?;
        }
        writeln!(f, "</svg>")
    }
}

/// Histogram of run totals.
struct DistributionChart<'a> {
    renderer: &'a SvgChartRenderer,
    result: &'a AnalysisResult,
}

impl fmt::Display for DistributionChart<'_> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bins = self.renderer.bins;
        let overall = &self.result.overall_statistics;
        let min = overall.min;
        let span = (overall.max - min).max(f64::EPSILON);

        let mut counts = vec![0_usize; bins];
        for detail in &self.result.execution_details {
            let idx = (((detail.total_time - min) / span) * bins as f64).floor() as usize;
            counts[idx.min(bins - 1)] += 1;
        }
        let peak = counts.iter().copied().max().unwrap_or(0).max(1);

        let plot_height = 200_u32;
        let height = plot_height + 3 * MARGIN + 20;
        let bar_width =
            (f64::from(self.renderer.width.saturating_sub(2 * MARGIN)) / bins as f64).floor() as u32;

        svg_open(f, self.renderer.width, height)?;
        writeln!(
            f,
            r#"<text x="{MARGIN}" y="{}" font-weight="bold">Run time distribution ({:.3}s to {:.3}s)</text>"#,
            MARGIN + 12,
            min,
            overall.max
        )?;
        let base = 2 * MARGIN + plot_height;
        for (i, count) in (0_u32..).zip(&counts) {
            let h = ((*count as f64 / peak as f64) * f64::from(plot_height)).round() as u32;
            writeln!(
                f,
                r##"<rect x="{}" y="{}" width="{}" height="{h}" fill="#7bbf6a"/>"##,
                MARGIN + i * bar_width,
                base - h,
                bar_width.saturating_sub(2)
            )?;
        }
        writeln!(f, "</svg>")
    }
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, result: &AnalysisResult, dir: &Path) -> Result<Vec<PathBuf>> {
        if result.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(2);
        if !result.summary.checkpoints_summary.is_empty() {
            let path = dir.join(CHECKPOINT_CHART);
            fs::write(&path, self.checkpoint_chart(result))?;
            written.push(path);
        }
        let path = dir.join(DISTRIBUTION_CHART);
        fs::write(&path, self.distribution_chart(result))?;
        written.push(path);

        info!(dir = %dir.display(), charts = written.len(), "charts written");
        Ok(written)
    }
}

fn svg_open(f: &mut fmt::Formatter<'_>, width: u32, height: u32) -> fmt::Result {
    writeln!(
        f,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         font-family=\"Arial, sans-serif\" font-size=\"12\">"
    )
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::record::{Checkpoint, RunRecord};

    fn sample_result() -> AnalysisResult {
        let records: Vec<RunRecord> = [1.0, 1.5, 3.0]
            .iter()
            .map(|total| {
                RunRecord::builder("run", "task")
                    .total_execution_time(*total)
                    .checkpoint(
                        "load<&>",
                        Checkpoint {
                            time_since_last: total / 2.0,
                            total_elapsed: total / 2.0,
                            timestamp: chrono::Utc::now(),
                            message: None,
                        },
                    )
                    .build()
            })
            .collect();
        aggregate(&records)
    }

    #[test]
    fn test_noop_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let written = NoopChartRenderer.render(&sample_result(), dir.path()).unwrap();
        assert!(written.is_empty());
        assert!(!NoopChartRenderer.is_enabled());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_svg_writes_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let written = SvgChartRenderer::new()
            .render(&sample_result(), dir.path())
            .unwrap();
        assert_eq!(written.len(), 2);

        let bars = fs::read_to_string(dir.path().join(CHECKPOINT_CHART)).unwrap();
        assert!(bars.starts_with("<svg"));
        assert!(bars.contains("load&lt;&amp;&gt;"));
        assert!(bars.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_svg_empty_result_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let written = SvgChartRenderer::new()
            .render(&AnalysisResult::empty(), dir.path())
            .unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_histogram_single_value() {
        let result = aggregate(&[RunRecord::builder("run", "t").total_execution_time(2.0).build()]);
        let svg = SvgChartRenderer::new().bins(0).distribution_chart(&result);
        assert_eq!(svg.matches("<rect").count(), 1);
    }

    #[test]
    fn test_chart_markup_is_complete() {
        let result = sample_result();
        let renderer = SvgChartRenderer::new().bins(3);

        let bars = renderer.checkpoint_chart(&result);
        assert_eq!(bars.matches("<svg").count(), 1);
        assert_eq!(bars.matches("<rect").count(), 1);
        assert_eq!(bars.matches("</svg>").count(), 1);

        let histogram = renderer.distribution_chart(&result);
        assert_eq!(histogram.matches("<rect").count(), 3);
        assert!(histogram.contains("1.000s to 3.000s"));
        assert!(histogram.trim_end().ends_with("</svg>"));
    }
}
