//! HTML report

use std::fmt;

use super::{suggestions, SuggestionLevel, SuggestionThresholds, NO_DATA_MESSAGE};
use crate::analysis::AnalysisResult;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.header { background-color: #f0f0f0; padding: 20px; border-radius: 5px; }
.metrics { margin: 20px 0; }
.metric-item { background-color: #f9f9f9; padding: 10px; margin: 5px 0; border-radius: 3px; }
.metric-item.needs_improvement { border-left: 4px solid #d9534f; }
.metric-item.improvement_recommended { border-left: 4px solid #f0ad4e; }
.metric-item.good { border-left: 4px solid #5cb85c; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
.no-data { color: #777; }
";

/// Render the HTML report with custom suggestion thresholds.
#[must_use]
pub fn render_html_with(result: &AnalysisResult, thresholds: SuggestionThresholds) -> String {
    HtmlReport { result, thresholds }.to_string()
}

struct HtmlReport<'a> {
    result: &'a AnalysisResult,
    thresholds: SuggestionThresholds,
}

impl fmt::Display for HtmlReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;

        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang=\"en\">")?;
        writeln!(f, "<head>")?;
        writeln!(f, "<meta charset=\"UTF-8\">")?;
        writeln!(f, "<title>Performance report</title>")?;
        writeln!(f, "<style>\n{STYLE}</style>")?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;

        writeln!(f, "<div class=\"header\">")?;
        writeln!(f, "<h1>Performance report</h1>")?;
        writeln!(
            f,
            "<p>Generated: {}</p>",
            result.analysis_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "<p>Executions analyzed: {}</p>", result.total_executions)?;
        writeln!(f, "</div>")?;

        if result.is_empty() {
            writeln!(f, "<p class=\"no-data\">{NO_DATA_MESSAGE}</p>")?;
            return writeln!(f, "</body>\n</html>");
        }

        let overall = &result.overall_statistics;
        writeln!(f, "<div class=\"metrics\">")?;
        writeln!(f, "<h2>Overall execution time</h2>")?;
        writeln!(f, "<table>")?;
        writeln!(
            f,
            "<tr><th>Runs</th><th>Mean (s)</th><th>Median (s)</th><th>Std dev</th><th>Min (s)</th><th>Max (s)</th><th>Total (s)</th></tr>"
        )?;
        writeln!(
            f,
            "<tr><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td></tr>",
            overall.count,
            overall.mean,
            overall.median,
            overall.std_dev,
            overall.min,
            overall.max,
            overall.sum
        )?;
        writeln!(f, "</table>")?;
        writeln!(f, "</div>")?;

        writeln!(f, "<div class=\"metrics\">")?;
        writeln!(f, "<h2>Checkpoint statistics</h2>")?;
        writeln!(f, "<table>")?;
        writeln!(
            f,
            "<tr><th>Checkpoint</th><th>Mean step (s)</th><th>Std dev</th><th>Min step (s)</th><th>Max step (s)</th><th>Mean cumulative (s)</th><th>Runs</th></tr>"
        )?;
        for (name, stats) in &result.checkpoint_statistics {
            let step = &stats.time_since_last;
            writeln!(
                f,
                "<tr><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{}</td></tr>",
                Escaped(name),
                step.mean,
                step.std_dev,
                step.min,
                step.max,
                stats.total_elapsed.mean,
                stats.count
            )?;
        }
        writeln!(f, "</table>")?;
        writeln!(f, "</div>")?;

        writeln!(f, "<div class=\"metrics\">")?;
        writeln!(f, "<h2>Checkpoint ranking</h2>")?;
        writeln!(f, "<ol>")?;
        for rank in &result.summary.checkpoints_summary {
            writeln!(
                f,
                "<li>{}: {:.3}s cumulative ({:.3}s since last, {} runs)</li>",
                Escaped(&rank.name),
                rank.avg_total_elapsed,
                rank.avg_time_since_last,
                rank.count
            )?;
        }
        writeln!(f, "</ol>")?;
        writeln!(f, "</div>")?;

        writeln!(f, "<div class=\"metrics\">")?;
        writeln!(f, "<h2>Suggested improvements</h2>")?;
        for suggestion in suggestions(result, self.thresholds) {
            let class = match suggestion.level {
                SuggestionLevel::Good => "good",
                SuggestionLevel::ImprovementRecommended => "improvement_recommended",
                SuggestionLevel::NeedsImprovement => "needs_improvement",
            };
            writeln!(
                f,
                "<div class=\"metric-item {class}\"><strong>{}</strong>: mean {:.3}s - {}</div>",
                Escaped(&suggestion.name),
                suggestion.mean_time_since_last,
                suggestion.level.label()
            )?;
        }
        writeln!(f, "</div>")?;

        writeln!(f, "</body>\n</html>")
    }
}

/// HTML-escapes text on display.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}
