//! # perf-checkpoint: Checkpoint Timing for Test Runs
//!
//! Drop a one-line checkpoint anywhere in a test to see how long each step
//! took, persist one JSON record per finished run, and aggregate records
//! from many parallel runs into per-checkpoint statistics.
//!
//! ## Components
//!
//! - [`timer::CheckpointTimer`]: named checkpoints for one run at a time
//! - [`RunRegistry`]: one timer per run identity, shared across threads
//! - [`emitter::LogEmitter`]: `execution_<task>_<timestamp>.json` per run
//! - [`analysis::StatisticsAggregator`]: load records, compute statistics
//! - [`report`]: text, HTML and SVG renderings
//!
//! ```text
//! start ──> checkpoint* ──> finish ──> LogEmitter ──> performance_logs/
//!                                                            │
//!          render_text / render_html <── aggregate <── load_records
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use perf_checkpoint::analysis::aggregate;
//! use perf_checkpoint::report::render_text;
//! use perf_checkpoint::{RunRegistry, TrackerConfig};
//!
//! # let dir = std::env::temp_dir().join("perf_checkpoint_doc");
//! let registry = RunRegistry::new(TrackerConfig::builder().output_dir(&dir).build());
//!
//! let run = registry.scoped("worker-1", "photo_upload");
//! run.track("login_done", None);
//! run.track("upload_done", Some("2 files"));
//! let summary = run.finish();
//! assert_eq!(summary.checkpoint_count, 2);
//!
//! let records = perf_checkpoint::analysis::load_records(&dir, "execution_*.json")?;
//! let report = render_text(&aggregate(&records));
//! assert!(report.contains("upload_done"));
//! # std::fs::remove_dir_all(&dir).ok();
//! # Ok::<(), perf_checkpoint::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analysis;
pub mod config;
pub mod emitter;
pub mod error;
pub mod record;
pub mod registry;
pub mod report;
pub mod stats;
pub mod timer;

pub use analysis::{AnalysisResult, StatisticsAggregator};
pub use config::TrackerConfig;
pub use error::{Error, Result};
pub use record::{Checkpoint, RunRecord};
pub use registry::{RunRegistry, TimedRun};
pub use stats::AggregateStatistics;
pub use timer::{CheckpointTimer, DuplicatePolicy, RunState, RunSummary};
