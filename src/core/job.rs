//! Scan job structures.
//!
//! A `ScanJob` tracks one scan request from acceptance to completion,
//! including the outcome recorded for every plugin it was dispatched to.

use crate::core::error::PluginError;
use crate::core::types::{ScanConfig, Target, VulnerabilityFinding};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a scan job.
///
/// `Pending` → `Running` → one of `Completed`, `Failed`, `Partial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet dispatched.
    Pending,
    /// At least one plugin dispatch is outstanding.
    Running,
    /// Every dispatched plugin succeeded (or none was eligible).
    Completed,
    /// Every dispatched plugin failed.
    Failed,
    /// Some plugins succeeded and some failed.
    Partial,
}

impl JobStatus {
    /// Returns `true` for the three terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Partial)
    }

    /// Derives the terminal status from per-plugin success counts.
    ///
    /// Zero dispatched plugins is a successful, empty scan.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// What one plugin produced for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PluginOutcome {
    /// The plugin returned findings (possibly none).
    Findings {
        /// The raw findings.
        findings: Vec<VulnerabilityFinding>,
    },
    /// The plugin call failed.
    Error {
        /// Why it failed.
        error: PluginError,
    },
}

impl PluginOutcome {
    /// Returns `true` if the plugin call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Findings { .. })
    }

    /// Returns the findings if the call succeeded.
    pub fn findings(&self) -> Option<&[VulnerabilityFinding]> {
        match self {
            Self::Findings { findings } => Some(findings),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error if the call failed.
    pub fn error(&self) -> Option<&PluginError> {
        match self {
            Self::Findings { .. } => None,
            Self::Error { error } => Some(error),
        }
    }
}

impl From<Result<Vec<VulnerabilityFinding>, PluginError>> for PluginOutcome {
    fn from(result: Result<Vec<VulnerabilityFinding>, PluginError>) -> Self {
        match result {
            Ok(findings) => Self::Findings { findings },
            Err(error) => Self::Error { error },
        }
    }
}

/// One scan request and everything recorded about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    /// Unique job identifier.
    pub id: Uuid,

    /// What is scanned.
    pub target: Target,

    /// How it is scanned.
    pub config: ScanConfig,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Plugins selected for dispatch, in selection order.
    pub dispatched_plugins: Vec<String>,

    /// Outcome per plugin, filled in as dispatches finish.
    pub per_plugin_results: HashMap<String, PluginOutcome>,

    /// When the request was accepted.
    pub created_at: DateTime<Utc>,

    /// When dispatch began.
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    /// Creates a new `Pending` job.
    pub fn new(target: Target, config: ScanConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            config,
            status: JobStatus::Pending,
            dispatched_plugins: Vec::new(),
            per_plugin_results: HashMap::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Moves the job to `Running` with the given dispatch set.
    pub(crate) fn start(&mut self, plugins: Vec<String>) {
        self.dispatched_plugins = plugins;
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Records a plugin's outcome. The first outcome for a plugin wins.
    ///
    /// Returns `false` if the plugin was not dispatched or already had an
    /// outcome.
    pub(crate) fn record(&mut self, plugin: &str, outcome: PluginOutcome) -> bool {
        if !self.dispatched_plugins.iter().any(|p| p == plugin)
            || self.per_plugin_results.contains_key(plugin)
        {
            return false;
        }
        self.per_plugin_results.insert(plugin.to_string(), outcome);
        true
    }

    /// Fills in `fallback` for any plugin without an outcome, then derives
    /// the terminal status.
    pub(crate) fn finish(&mut self, fallback: impl Fn(&str) -> PluginError) -> JobStatus {
        for plugin in self.outstanding_plugins() {
            let error = fallback(&plugin);
            self.per_plugin_results
                .insert(plugin, PluginOutcome::Error { error });
        }

        let succeeded = self
            .per_plugin_results
            .values()
            .filter(|o| o.is_success())
            .count();
        let failed = self.per_plugin_results.len() - succeeded;

        self.status = JobStatus::from_counts(succeeded, failed);
        self.completed_at = Some(Utc::now());
        self.status
    }

    /// Returns `true` once the job is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the dispatched plugins that have no outcome yet.
    pub fn outstanding_plugins(&self) -> Vec<String> {
        self.dispatched_plugins
            .iter()
            .filter(|p| !self.per_plugin_results.contains_key(*p))
            .cloned()
            .collect()
    }

    /// Returns the recorded outcomes in dispatch order.
    pub fn ordered_results(&self) -> impl Iterator<Item = (&str, &PluginOutcome)> {
        self.dispatched_plugins.iter().filter_map(|name| {
            self.per_plugin_results
                .get(name)
                .map(|outcome| (name.as_str(), outcome))
        })
    }

    /// Returns the plugins whose call failed.
    pub fn failed_plugins(&self) -> Vec<&str> {
        self.ordered_results()
            .filter(|(_, o)| !o.is_success())
            .map(|(name, _)| name)
            .collect()
    }

    /// Returns the total number of raw findings across plugins.
    pub fn raw_finding_count(&self) -> usize {
        self.per_plugin_results
            .values()
            .filter_map(|o| o.findings())
            .map(|f| f.len())
            .sum()
    }
}
