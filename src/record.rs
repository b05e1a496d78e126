//! Run Record - persisted outcome of one finished run

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Run name used when a run is auto-started or never named.
pub const DEFAULT_RUN_NAME: &str = "unknown_test";

/// A named marker inside a run.
///
/// The checkpoint name is the key of the owning map, so it is not repeated
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Seconds since the previous checkpoint (or since start for the first).
    #[serde(default)]
    pub time_since_last: f64,
    /// Seconds since the run started.
    #[serde(default)]
    pub total_elapsed: f64,
    /// Wall-clock time the checkpoint was recorded.
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    /// Optional free-form note.
    #[serde(default)]
    pub message: Option<String>,
}

/// Run Record as written by the emitter and read by the aggregator.
///
/// Field names follow the on-disk JSON layout, so records written by other
/// tooling with the same shape load as well. Non-string environment values
/// (such as a numeric thread id) are kept in their JSON text form, and a
/// checkpoint entry that is not an object is dropped without failing the
/// rest of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default = "default_run_name")]
    test_name: String,
    #[serde(default = "default_task_id")]
    task_id: String,
    #[serde(default)]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    total_execution_time: f64,
    #[serde(default)]
    checkpoint_count: usize,
    #[serde(default, deserialize_with = "lenient_checkpoints")]
    checkpoints: IndexMap<String, Checkpoint>,
    #[serde(default, deserialize_with = "lenient_environment")]
    environment: BTreeMap<String, String>,
}

fn lenient_checkpoints<'de, D>(deserializer: D) -> Result<IndexMap<String, Checkpoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| {
            if !value.is_object() {
                warn!(checkpoint = %name, "skipping non-object checkpoint");
                return None;
            }
            match serde_json::from_value::<Checkpoint>(value) {
                Ok(checkpoint) => Some((name, checkpoint)),
                Err(err) => {
                    warn!(checkpoint = %name, error = %err, "skipping malformed checkpoint");
                    None
                }
            }
        })
        .collect())
}

fn lenient_environment<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((key, text)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

fn default_run_name() -> String {
    DEFAULT_RUN_NAME.to_string()
}

fn default_task_id() -> String {
    "unknown".to_string()
}

impl RunRecord {
    /// Create a builder for a record.
    #[must_use]
    pub fn builder(test_name: impl Into<String>, task_id: impl Into<String>) -> RunRecordBuilder {
        RunRecordBuilder::new(test_name, task_id)
    }

    /// Name of the run (test name).
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Identity of the task that produced the record.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Time the record was produced.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Time the run started, when known.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Seconds from start to finish.
    #[must_use]
    pub const fn total_execution_time(&self) -> f64 {
        self.total_execution_time
    }

    /// Number of checkpoints as recorded by the writer.
    #[must_use]
    pub const fn checkpoint_count(&self) -> usize {
        self.checkpoint_count
    }

    /// Checkpoints in recording order.
    #[must_use]
    pub const fn checkpoints(&self) -> &IndexMap<String, Checkpoint> {
        &self.checkpoints
    }

    /// Free-form environment tags.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    record: RunRecord,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(test_name: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            record: RunRecord {
                test_name: test_name.into(),
                task_id: task_id.into(),
                timestamp: Utc::now(),
                started_at: None,
                total_execution_time: 0.0,
                checkpoint_count: 0,
                checkpoints: IndexMap::new(),
                environment: BTreeMap::new(),
            },
        }
    }

    /// Set the record timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Set the run start time.
    #[must_use]
    pub const fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.record.started_at = Some(started_at);
        self
    }

    /// Set the total execution time in seconds.
    #[must_use]
    pub const fn total_execution_time(mut self, seconds: f64) -> Self {
        self.record.total_execution_time = seconds;
        self
    }

    /// Append a checkpoint.
    #[must_use]
    pub fn checkpoint(mut self, name: impl Into<String>, checkpoint: Checkpoint) -> Self {
        self.record.checkpoints.insert(name.into(), checkpoint);
        self
    }

    /// Replace all checkpoints.
    #[must_use]
    pub fn checkpoints(mut self, checkpoints: IndexMap<String, Checkpoint>) -> Self {
        self.record.checkpoints = checkpoints;
        self
    }

    /// Add environment tags.
    #[must_use]
    pub fn environment<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record
            .environment
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(mut self) -> RunRecord {
        self.record.checkpoint_count = self.record.checkpoints.len();
        self.record
    }
}
