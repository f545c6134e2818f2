//! Plugin descriptors.

use crate::core::{HealthStatus, ScanType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything the orchestrator knows about a configured plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin name, e.g. "slither".
    pub name: String,

    /// Base URL of the plugin service (empty for in-process plugins).
    pub endpoint_url: String,

    /// Scan types the plugin can serve.
    pub supported_scan_types: BTreeSet<ScanType>,

    /// Health as of the last probe.
    #[serde(default)]
    pub health_status: HealthStatus,

    /// When the last probe completed.
    #[serde(default)]
    pub last_health_check_time: Option<DateTime<Utc>>,

    /// Time limit for one call to the plugin; zero defers to the job
    /// deadline.
    pub timeout_seconds: u64,

    /// Concurrent scans the plugin service accepts, across all jobs.
    pub max_concurrency: usize,
}

impl PluginDescriptor {
    /// Creates a descriptor with unknown health.
    pub fn new(name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            supported_scan_types: BTreeSet::new(),
            health_status: HealthStatus::Unknown,
            last_health_check_time: None,
            timeout_seconds: 300,
            max_concurrency: 1,
        }
    }

    /// Adds a supported scan type.
    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.supported_scan_types.insert(scan_type);
        self
    }

    /// Adds several supported scan types.
    pub fn with_scan_types(mut self, scan_types: impl IntoIterator<Item = ScanType>) -> Self {
        self.supported_scan_types.extend(scan_types);
        self
    }

    /// Sets the initial health status.
    pub fn with_health(mut self, status: HealthStatus) -> Self {
        self.health_status = status;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the concurrency the plugin accepts.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Returns `true` if the plugin may serve a request of `scan_type`.
    pub fn supports(&self, scan_type: ScanType) -> bool {
        scan_type.is_served_by(&self.supported_scan_types)
    }

    /// Time limit for one call within a job allowed `job_seconds`.
    pub fn call_timeout_seconds(&self, job_seconds: u64) -> u64 {
        match self.timeout_seconds {
            0 => job_seconds,
            own => own.min(job_seconds),
        }
    }

    /// Returns `true` if the plugin is healthy and supports `scan_type`.
    pub fn is_eligible(&self, scan_type: ScanType) -> bool {
        self.health_status.is_healthy() && self.supports(scan_type)
    }
}
