//! Report rendering tests

use chrono::Utc;
use perf_checkpoint::analysis::aggregate;
use perf_checkpoint::report::{
    render_html, render_html_with, render_text, suggestions, SuggestionLevel,
    SuggestionThresholds, NO_DATA_MESSAGE,
};
use perf_checkpoint::{AnalysisResult, Checkpoint, RunRecord};

fn checkpoint(since_last: f64, elapsed: f64) -> Checkpoint {
    Checkpoint {
        time_since_last: since_last,
        total_elapsed: elapsed,
        timestamp: Utc::now(),
        message: None,
    }
}

fn sample() -> AnalysisResult {
    let records = [
        RunRecord::builder("photo_upload", "task-a")
            .total_execution_time(8.0)
            .checkpoint("login", checkpoint(1.0, 1.0))
            .checkpoint("upload <large>", checkpoint(6.0, 7.0))
            .checkpoint("verify", checkpoint(0.5, 7.5))
            .build(),
        RunRecord::builder("photo_upload", "task-b")
            .total_execution_time(9.0)
            .checkpoint("login", checkpoint(1.2, 1.2))
            .checkpoint("upload <large>", checkpoint(6.4, 7.6))
            .checkpoint("verify", checkpoint(0.7, 8.3))
            .build(),
    ];
    aggregate(&records)
}

#[test]
fn test_text_report_sections() {
    let text = render_text(&sample());

    assert!(text.contains("Parallel execution performance report"));
    assert!(text.contains("Executions: 2"));
    assert!(text.contains("mean:    8.500s"));
    assert!(text.contains("Checkpoint ranking"));
    assert!(text.contains("Checkpoint details"));
    assert!(text.contains("Execution details"));
    assert!(text.contains("task-b"));

    let login = text.find(" 1. login").unwrap();
    let upload = text.find(" 2. upload <large>").unwrap();
    let verify = text.find(" 3. verify").unwrap();
    assert!(login < upload && upload < verify);
}

#[test]
fn test_text_report_empty() {
    assert_eq!(render_text(&aggregate(&[])), NO_DATA_MESSAGE);
}

#[test]
fn test_html_report_structure() {
    let html = render_html(&sample());

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.trim_end().ends_with("</html>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("upload &lt;large&gt;"));
    assert!(!html.contains("upload <large>"));
    assert!(html.contains("needs improvement"));
}

#[test]
fn test_html_report_empty() {
    let html = render_html(&aggregate(&[]));
    assert!(html.contains(NO_DATA_MESSAGE));
    assert!(html.trim_end().ends_with("</html>"));
}

#[test]
fn test_suggestions_follow_thresholds() {
    let result = sample();

    let default = suggestions(&result, SuggestionThresholds::default());
    assert_eq!(default[0].name, "upload <large>");
    assert_eq!(default[0].level, SuggestionLevel::NeedsImprovement);
    assert_eq!(default[1].level, SuggestionLevel::Good);

    let strict = suggestions(
        &result,
        SuggestionThresholds {
            warn: 0.1,
            critical: 1.0,
        },
    );
    assert_eq!(strict.len(), 3);
    assert_eq!(strict[1].name, "login");
    assert_eq!(strict[1].level, SuggestionLevel::NeedsImprovement);
    assert_eq!(strict[2].level, SuggestionLevel::ImprovementRecommended);

    let html = render_html_with(
        &result,
        SuggestionThresholds {
            warn: 100.0,
            critical: 200.0,
        },
    );
    assert!(!html.contains("needs improvement"));
}
