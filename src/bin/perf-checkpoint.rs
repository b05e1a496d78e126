//! `perf-checkpoint` command line
//!
//! `analyze` aggregates persisted run records into reports; `demo` simulates
//! parallel test runs to produce records worth analyzing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use perf_checkpoint::analysis::{save_analysis, StatisticsAggregator};
use perf_checkpoint::config::DEFAULT_OUTPUT_DIR;
use perf_checkpoint::emitter::RECORD_PATTERN;
use perf_checkpoint::report::{
    render_html_with, render_text, ChartRenderer, NoopChartRenderer, SuggestionThresholds,
    SvgChartRenderer, DEFAULT_CHART_DIR,
};
use perf_checkpoint::{RunRegistry, TrackerConfig};

#[derive(Debug, Parser)]
#[command(name = "perf-checkpoint", version, about = "Checkpoint timing analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aggregate run records and print a report
    Analyze(AnalyzeArgs),
    /// Simulate parallel runs, then analyze them
    Demo(DemoArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Directory containing run records
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "PERF_CHECKPOINT_OUTPUT_DIR")]
    log_dir: PathBuf,

    /// Filename glob selecting run records
    #[arg(long, default_value = RECORD_PATTERN)]
    pattern: String,

    /// Where the JSON analysis and text report are saved (defaults to --log-dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not save the JSON analysis and text report
    #[arg(long)]
    no_save: bool,

    /// Also write an HTML report to this path
    #[arg(long)]
    html: Option<PathBuf>,

    /// Write SVG charts into this directory
    #[arg(long)]
    charts: Option<PathBuf>,

    /// Mean step time (s) above which improvement is recommended
    #[arg(long, default_value_t = 2.0)]
    warn_threshold: f64,

    /// Mean step time (s) above which a checkpoint needs improvement
    #[arg(long, default_value_t = 5.0)]
    critical_threshold: f64,
}

#[derive(Debug, Args)]
struct DemoArgs {
    /// Number of simulated runs
    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Worker threads
    #[arg(long, default_value_t = 3)]
    threads: usize,

    /// Base delay per step in milliseconds
    #[arg(long, default_value_t = 50)]
    base_delay_ms: u64,

    /// Directory run records are written to
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "PERF_CHECKPOINT_OUTPUT_DIR")]
    log_dir: PathBuf,

    /// Keep run records from earlier runs instead of clearing them first
    #[arg(long)]
    keep: bool,
}

const DEMO_STEPS: [(&str, &str, u64); 5] = [
    ("initialization", "setting up fixtures", 50),
    ("page_load", "loading the page", 100),
    ("user_interaction", "filling the form", 80),
    ("data_validation", "checking results", 30),
    ("cleanup", "tearing down", 20),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match Cli::parse().command {
        Command::Analyze(args) => analyze(&args),
        Command::Demo(args) => demo(&args),
    }
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let aggregator = StatisticsAggregator::with_pattern(&args.pattern)
        .with_context(|| format!("invalid --pattern {}", args.pattern))?;
    let result = aggregator.analyze_dir(&args.log_dir);

    println!("{}", render_text(&result));

    if result.is_empty() {
        info!(dir = %args.log_dir.display(), pattern = %args.pattern, "no run records found");
        return Ok(());
    }

    if !args.no_save {
        let dir = args.output_dir.as_ref().unwrap_or(&args.log_dir);
        let (json, report) = save_analysis(&result, dir)
            .with_context(|| format!("saving analysis into {}", dir.display()))?;
        println!("\nJSON:   {}\nReport: {}", json.display(), report.display());
    }

    if let Some(path) = &args.html {
        let thresholds = SuggestionThresholds {
            warn: args.warn_threshold,
            critical: args.critical_threshold,
        };
        std::fs::write(path, render_html_with(&result, thresholds))
            .with_context(|| format!("writing HTML report {}", path.display()))?;
        println!("HTML:   {}", path.display());
    }

    let renderer: Box<dyn ChartRenderer> = if args.charts.is_some() {
        Box::new(SvgChartRenderer::new())
    } else {
        Box::new(NoopChartRenderer)
    };
    let chart_dir = args
        .charts
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHART_DIR));
    for chart in renderer
        .render(&result, &chart_dir)
        .with_context(|| format!("writing charts into {}", chart_dir.display()))?
    {
        println!("Chart:  {}", chart.display());
    }

    Ok(())
}

fn demo(args: &DemoArgs) -> Result<()> {
    let aggregator = StatisticsAggregator::new();
    if !args.keep {
        let removed = aggregator
            .clear_records(&args.log_dir)
            .with_context(|| format!("clearing old records in {}", args.log_dir.display()))?;
        info!(removed, dir = %args.log_dir.display(), "cleared previous run records");
    }

    let config = TrackerConfig::builder()
        .output_dir(&args.log_dir)
        .task_id(TrackerConfig::from_env().task_id())
        .tag("source", "demo")
        .build();
    let registry = Arc::new(RunRegistry::new(config));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .thread_name(|i| format!("demo-worker-{i}"))
        .build()
        .context("building worker pool")?;

    info!(runs = args.runs, threads = args.threads, "starting simulated runs");
    pool.install(|| {
        (0..args.runs).into_par_iter().for_each(|id| {
            let run = registry.scoped(&format!("run-{id}"), &format!("parallel_test_{id}"));
            for (step, (name, message, step_ms)) in (0_u64..).zip(DEMO_STEPS) {
                run.track(name, Some(message));
                std::thread::sleep(step_delay(args.base_delay_ms, step_ms, id as u64, step));
            }
            let summary = run.finish();
            info!(run = id, total = summary.total_execution_time, "simulated run done");
        });
    });

    let result = aggregator.analyze_dir(&args.log_dir);
    println!("{}", render_text(&result));
    Ok(())
}

/// Deterministic jitter in [-20ms, +50ms), never below 10ms.
fn step_delay(base_ms: u64, step_ms: u64, run: u64, step: u64) -> Duration {
    let jitter = (run * 7 + step * 13) % 70;
    let ms = (base_ms + step_ms + jitter).saturating_sub(20).max(10);
    Duration::from_millis(ms)
}
