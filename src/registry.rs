//! Run Registry - one timer per run identity
//!
//! The registry is an explicit object owned by the caller (typically held in
//! an `Arc` and shared with worker threads). Lookups are fetch-or-create on
//! a `DashMap` entry, so two workers racing on the same identity always get
//! the same timer.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::config::{sanitize_tag, TrackerConfig};
use crate::timer::{CheckpointTimer, Clock, RunState, RunSummary, SystemClock};

/// Identity → timer map shared by concurrent runs.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use perf_checkpoint::{RunRegistry, TrackerConfig};
///
/// let registry = Arc::new(RunRegistry::new(TrackerConfig::from_env()));
///
/// std::thread::scope(|s| {
///     for worker in 0..4 {
///         let registry = Arc::clone(&registry);
///         s.spawn(move || {
///             let run = registry.scoped(&format!("worker-{worker}"), "upload_photo");
///             run.track("form_opened", None);
///             run.track("upload_done", Some("3 MB"));
///         });
///     }
/// });
/// ```
#[derive(Debug)]
pub struct RunRegistry {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    timers: DashMap<String, Arc<CheckpointTimer>>,
}

impl RunRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            timers: DashMap::new(),
        }
    }

    /// Replace the time source used for timers created from now on.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration timers are created from.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Fetch the timer for `identity`, creating it on first use.
    #[must_use]
    pub fn get_or_create(&self, identity: &str) -> Arc<CheckpointTimer> {
        if let Some(timer) = self.timers.get(identity) {
            return Arc::clone(timer.value());
        }
        let entry = self.timers.entry(identity.to_string()).or_insert_with(|| {
            debug!(identity, "creating timer");
            Arc::new(self.build_timer(identity))
        });
        Arc::clone(entry.value())
    }

    /// Alias of [`get_or_create`](Self::get_or_create).
    #[must_use]
    pub fn get_timer(&self, identity: &str) -> Arc<CheckpointTimer> {
        self.get_or_create(identity)
    }

    /// Timer for the calling thread, keyed by its name or id.
    #[must_use]
    pub fn current_thread(&self) -> Arc<CheckpointTimer> {
        let thread = std::thread::current();
        let identity = thread
            .name()
            .map_or_else(|| format!("{:?}", thread.id()), str::to_string);
        self.get_or_create(&identity)
    }

    /// Start a run and finish it when the returned guard goes out of scope.
    #[must_use]
    pub fn scoped(&self, identity: &str, run_name: &str) -> TimedRun {
        let timer = self.get_or_create(identity);
        timer.start(run_name);
        TimedRun {
            timer,
            finished: false,
        }
    }

    /// Drop the timer for `identity`.
    pub fn remove(&self, identity: &str) -> Option<Arc<CheckpointTimer>> {
        self.timers.remove(identity).map(|(_, timer)| timer)
    }

    /// Drop every timer whose run has finished; returns how many went.
    pub fn prune_finished(&self) -> usize {
        let before = self.timers.len();
        self.timers
            .retain(|_, timer| timer.state() != RunState::Finished);
        before.saturating_sub(self.timers.len())
    }

    /// Registered identities (unordered).
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        self.timers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// True if no timer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn build_timer(&self, identity: &str) -> CheckpointTimer {
        CheckpointTimer::new(&self.config)
            .with_task_id(format!("{}_{}", self.config.task_id(), sanitize_tag(identity)))
            .with_tag("run_identity", identity)
            .with_clock(Arc::clone(&self.clock))
    }
}

/// A run that finishes itself on drop.
///
/// Finishing happens on every exit path, including early `?` returns and
/// panics unwinding through the owning scope.
#[derive(Debug)]
pub struct TimedRun {
    timer: Arc<CheckpointTimer>,
    finished: bool,
}

impl TimedRun {
    /// Record a checkpoint in this run.
    pub fn track(&self, name: &str, message: Option<&str>) -> f64 {
        self.timer.checkpoint(name, message)
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.timer.summary()
    }

    /// Underlying timer.
    #[must_use]
    pub fn timer(&self) -> &CheckpointTimer {
        &self.timer
    }

    /// Finish now and return the summary.
    pub fn finish(mut self) -> RunSummary {
        self.finished = true;
        self.timer.finish(None)
    }
}

impl Drop for TimedRun {
    fn drop(&mut self) {
        if !self.finished {
            self.timer.finish(None);
        }
    }
}
