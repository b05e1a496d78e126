//! Checkpoint timer
//!
//! A [`CheckpointTimer`] measures one logical run at a time. Each
//! [`checkpoint`](CheckpointTimer::checkpoint) stores the seconds since the
//! previous checkpoint and since the run started, so a test can drop a
//! single line before any assertion to see where its time goes.
//!
//! ```text
//! NotStarted ──start──> Running ──checkpoint*──> Running ──finish──> Finished
//!      └──checkpoint (auto-start)──^                                   │
//!                                  ^──────start / checkpoint───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use perf_checkpoint::timer::CheckpointTimer;
//!
//! let timer = CheckpointTimer::in_memory("local");
//! timer.start("login_flow");
//! timer.checkpoint("page_loaded", None);
//! timer.checkpoint("form_submitted", Some("valid credentials"));
//!
//! let summary = timer.finish(None);
//! assert_eq!(summary.checkpoint_count, 2);
//! ```

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::TrackerConfig;
use crate::emitter::LogEmitter;
use crate::record::{Checkpoint, RunRecord, DEFAULT_RUN_NAME};
use crate::{Error, Result};

/// Lifecycle of the run currently held by a timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run has been started.
    #[default]
    NotStarted,
    /// A run is accepting checkpoints.
    Running,
    /// The run was finished; the next start or checkpoint begins a new run.
    Finished,
}

/// What to do when a checkpoint name repeats within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Store the repeat as `name#2`, `name#3`, ...
    #[default]
    Suffix,
    /// Overwrite the earlier checkpoint (moved to the end of the run).
    Replace,
    /// Refuse the repeat.
    Reject,
}

/// Snapshot of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Name of the run.
    pub run_name: String,
    /// Wall-clock start, `None` when the timer was never started.
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since start (frozen once finished).
    pub total_execution_time: f64,
    /// Checkpoints in recording order.
    pub checkpoints: IndexMap<String, Checkpoint>,
    /// Number of stored checkpoints.
    pub checkpoint_count: usize,
}

impl RunSummary {
    /// True when the timer had never been started.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.started_at.is_none()
    }
}

#[derive(Debug, Default)]
struct TimerState {
    phase: RunState,
    run_name: String,
    start: Option<Instant>,
    last: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    finished_total: Option<f64>,
    checkpoints: IndexMap<String, Checkpoint>,
}

impl TimerState {
    fn begin(&mut self, run_name: String, now: Instant) {
        self.phase = RunState::Running;
        self.run_name = run_name;
        self.start = Some(now);
        self.last = Some(now);
        self.started_at = Some(Utc::now());
        self.finished_total = None;
        self.checkpoints.clear();
    }

    fn elapsed(&self, now: Instant) -> f64 {
        self.finished_total.unwrap_or_else(|| {
            self.start
                .map_or(0.0, |start| now.saturating_duration_since(start).as_secs_f64())
        })
    }

    fn summary(&self, now: Instant) -> RunSummary {
        if self.started_at.is_none() {
            return RunSummary::default();
        }
        RunSummary {
            run_name: self.run_name.clone(),
            started_at: self.started_at,
            total_execution_time: self.elapsed(now),
            checkpoints: self.checkpoints.clone(),
            checkpoint_count: self.checkpoints.len(),
        }
    }
}

/// Timer for one logical run at a time.
///
/// All state sits behind a single mutex, so checkpoints from several call
/// sites of the same run are serialized and observe increasing
/// `total_elapsed`.
#[derive(Debug)]
pub struct CheckpointTimer {
    task_id: String,
    duplicate_policy: DuplicatePolicy,
    environment: BTreeMap<String, String>,
    emitter: Option<LogEmitter>,
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
}

impl CheckpointTimer {
    /// Create a timer that persists finished runs under the configured
    /// output directory.
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            task_id: config.task_id().to_string(),
            duplicate_policy: config.duplicate_policy(),
            environment: config.environment().clone(),
            emitter: Some(LogEmitter::new(config.output_dir())),
            clock: Arc::new(SystemClock),
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Create a timer that never writes records.
    #[must_use]
    pub fn in_memory(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            duplicate_policy: DuplicatePolicy::default(),
            environment: BTreeMap::new(),
            emitter: None,
            clock: Arc::new(SystemClock),
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the task id written into records.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Override the duplicate checkpoint policy.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Add an environment tag written into records.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Task id written into records.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().phase
    }

    /// Name of the current (or last) run.
    #[must_use]
    pub fn run_name(&self) -> String {
        self.lock().run_name.clone()
    }

    /// Start a new run, discarding any unfinished checkpoints.
    pub fn start(&self, run_name: impl Into<String>) -> &Self {
        let run_name = run_name.into();
        let mut state = self.lock();
        state.begin(run_name, self.clock.now());
        info!(
            run = %state.run_name,
            task_id = %self.task_id,
            started_at = ?state.started_at,
            "run started"
        );
        self
    }

    /// Record a checkpoint and return seconds since the previous one.
    ///
    /// Starts an implicit run named [`DEFAULT_RUN_NAME`] when no run is
    /// active. Under [`DuplicatePolicy::Reject`] a repeated name is logged,
    /// not stored, and `0.0` is returned; use
    /// [`try_checkpoint`](Self::try_checkpoint) to observe the rejection.
    pub fn checkpoint(&self, name: &str, message: Option<&str>) -> f64 {
        match self.try_checkpoint(name, message) {
            Ok(since_last) => since_last,
            Err(err) => {
                warn!(error = %err, "checkpoint rejected");
                0.0
            }
        }
    }

    /// Record a checkpoint, surfacing duplicate rejections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCheckpoint`] when `name` already exists in
    /// the run and the policy is [`DuplicatePolicy::Reject`].
    pub fn try_checkpoint(&self, name: &str, message: Option<&str>) -> Result<f64> {
        let mut state = self.lock();
        if state.phase != RunState::Running {
            state.begin(DEFAULT_RUN_NAME.to_string(), self.clock.now());
            info!(run = DEFAULT_RUN_NAME, task_id = %self.task_id, "run auto-started");
        }

        let key = self.resolve_name(&state, name)?;

        let now = self.clock.now();
        let start = state.start.unwrap_or(now);
        let last = state.last.unwrap_or(start);
        let time_since_last = now.saturating_duration_since(last).as_secs_f64();
        let total_elapsed = now.saturating_duration_since(start).as_secs_f64();

        if self.duplicate_policy == DuplicatePolicy::Replace {
            state.checkpoints.shift_remove(&key);
        }
        state.checkpoints.insert(
            key.clone(),
            Checkpoint {
                time_since_last,
                total_elapsed,
                timestamp: Utc::now(),
                message: message.map(str::to_string),
            },
        );
        state.last = Some(now);

        info!(
            run = %state.run_name,
            checkpoint = %key,
            message = message.unwrap_or(""),
            "+{time_since_last:.3}s (total {total_elapsed:.3}s)"
        );

        Ok(time_since_last)
    }

    fn resolve_name(&self, state: &TimerState, name: &str) -> Result<String> {
        if !state.checkpoints.contains_key(name) {
            return Ok(name.to_string());
        }
        match self.duplicate_policy {
            DuplicatePolicy::Replace => Ok(name.to_string()),
            DuplicatePolicy::Reject => Err(Error::DuplicateCheckpoint {
                run: state.run_name.clone(),
                name: name.to_string(),
            }),
            DuplicatePolicy::Suffix => Ok((2..)
                .map(|n| format!("{name}#{n}"))
                .find(|candidate| !state.checkpoints.contains_key(candidate))
                .unwrap_or_else(|| name.to_string())),
        }
    }

    /// Snapshot of the current run; empty if never started.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.lock().summary(self.clock.now())
    }

    /// Finish the run, persist its record and return the summary.
    ///
    /// `run_name` overrides the name given at start. A persistence failure
    /// is logged and the summary is still returned. Finishing a timer that
    /// was never started returns an empty summary and writes nothing;
    /// finishing twice returns the frozen summary without a second record.
    pub fn finish(&self, run_name: Option<&str>) -> RunSummary {
        let summary = {
            let mut state = self.lock();
            match state.phase {
                RunState::NotStarted => return RunSummary::default(),
                RunState::Finished => return state.summary(self.clock.now()),
                RunState::Running => {}
            }
            let now = self.clock.now();
            state.finished_total = Some(state.elapsed(now));
            state.phase = RunState::Finished;
            if let Some(name) = run_name {
                state.run_name = name.to_string();
            }
            state.summary(now)
        };

        info!(
            run = %summary.run_name,
            total_execution_time = summary.total_execution_time,
            checkpoint_count = summary.checkpoint_count,
            "run finished in {:.3}s",
            summary.total_execution_time
        );

        if let Some(emitter) = &self.emitter {
            let record = self.to_record(&summary);
            if let Err(err) = emitter.emit(&record) {
                error!(run = %summary.run_name, error = %err, "failed to persist run record");
            }
        }

        summary
    }

    fn to_record(&self, summary: &RunSummary) -> RunRecord {
        let thread = std::thread::current();
        let mut builder = RunRecord::builder(summary.run_name.clone(), self.task_id.clone())
            .total_execution_time(summary.total_execution_time)
            .checkpoints(summary.checkpoints.clone())
            .environment(self.environment.clone())
            .environment([("thread", thread.name().unwrap_or("unnamed"))]);
        if let Some(started_at) = summary.started_at {
            builder = builder.started_at(started_at);
        }
        builder.build()
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
