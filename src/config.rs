//! Tracker configuration
//!
//! Resolves where run records go, how the emitting task identifies itself
//! and which environment tags accompany each record.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::timer::DuplicatePolicy;

/// Default directory for persisted run records.
pub const DEFAULT_OUTPUT_DIR: &str = "performance_logs";

/// Env var overriding [`TrackerConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "PERF_CHECKPOINT_OUTPUT_DIR";

/// Env var holding an ECS task ARN; its last path segment becomes the task id.
pub const ECS_TASK_ARN_ENV: &str = "ECS_TASK_ARN";

/// Env var holding a container hostname, used when no task ARN is set.
pub const HOSTNAME_ENV: &str = "HOSTNAME";

/// Env var overriding the `runtime_version` environment tag.
pub const RUNTIME_VERSION_ENV: &str = "PERF_CHECKPOINT_RUNTIME_VERSION";

/// Configuration shared by every timer created from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    output_dir: PathBuf,
    task_id: String,
    #[serde(default)]
    duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    environment: BTreeMap<String, String>,
}

impl TrackerConfig {
    /// Build a configuration from the process environment.
    ///
    /// Reads [`OUTPUT_DIR_ENV`], [`ECS_TASK_ARN_ENV`], [`HOSTNAME_ENV`] and
    /// [`RUNTIME_VERSION_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let ecs_task_arn = std::env::var(ECS_TASK_ARN_ENV).unwrap_or_default();
        let hostname = std::env::var(HOSTNAME_ENV).unwrap_or_default();
        let runtime_version = std::env::var(RUNTIME_VERSION_ENV)
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let mut builder = Self::builder()
            .task_id(resolve_task_id(&ecs_task_arn, &hostname))
            .tag("ecs_task_arn", ecs_task_arn)
            .tag("hostname", hostname)
            .tag("runtime_version", runtime_version);

        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                builder = builder.output_dir(dir);
            }
        }

        builder.build()
    }

    /// Create a builder with defaults and a locally generated task id.
    #[must_use]
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::new()
    }

    /// Directory run records are written to.
    #[must_use]
    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// Identity of the emitting task (container, ECS task or local process).
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// How repeated checkpoint names within one run are handled.
    #[must_use]
    pub const fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Free-form tags copied into every persisted record.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for `TrackerConfig`.
#[derive(Debug)]
pub struct TrackerConfigBuilder {
    output_dir: PathBuf,
    task_id: Option<String>,
    duplicate_policy: DuplicatePolicy,
    environment: BTreeMap<String, String>,
}

impl TrackerConfigBuilder {
    /// Create a builder with default output dir and policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            task_id: None,
            duplicate_policy: DuplicatePolicy::default(),
            environment: BTreeMap::new(),
        }
    }

    /// Set the record output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set an explicit task id.
    #[must_use]
    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Set the duplicate checkpoint policy.
    #[must_use]
    pub const fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Add an environment tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Build the `TrackerConfig`.
    #[must_use]
    pub fn build(self) -> TrackerConfig {
        TrackerConfig {
            output_dir: self.output_dir,
            task_id: self
                .task_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| resolve_task_id("", "")),
            duplicate_policy: self.duplicate_policy,
            environment: self.environment,
        }
    }
}

impl Default for TrackerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a task id: ECS task ARN tail, then hostname, then a local fallback.
#[must_use]
pub fn resolve_task_id(ecs_task_arn: &str, hostname: &str) -> String {
    if let Some(tail) = ecs_task_arn.rsplit('/').next().filter(|s| !s.is_empty()) {
        return sanitize_tag(tail);
    }
    if !hostname.is_empty() {
        return sanitize_tag(hostname);
    }
    format!(
        "local_{}_{}",
        std::process::id(),
        Utc::now().format("%Y%m%d_%H%M%S")
    )
}

/// Restrict a tag to characters safe inside a filename.
#[must_use]
pub fn sanitize_tag(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
