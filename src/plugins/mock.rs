//! Mock plugin for testing.
//!
//! This module provides a configurable in-process plugin that can be used
//! in tests to simulate scanner behavior without running a real tool.

use crate::core::{
    HealthStatus, PluginError, ScanConfig, ScannerPlugin, Severity, Target, VulnerabilityFinding,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A mock scanner plugin for testing purposes.
///
/// # Examples
///
/// ```rust
/// use scanhub::plugins::MockPlugin;
/// use scanhub::core::{PluginError, Severity};
/// use std::time::Duration;
///
/// // A plugin that reports one reentrancy finding
/// let plugin = MockPlugin::new("slither").with_finding("reentrancy", Severity::High, "L42", 0.9);
///
/// // A plugin that always fails
/// let plugin = MockPlugin::new("mythril").with_error(PluginError::reported("solc missing"));
///
/// // A slow plugin
/// let plugin = MockPlugin::new("manticore").with_latency(Duration::from_secs(5));
/// ```
#[derive(Debug)]
pub struct MockPlugin {
    /// Name of this plugin instance.
    name: String,
    /// Findings returned by every successful scan.
    findings: RwLock<Vec<VulnerabilityFinding>>,
    /// Error returned instead of findings, if set.
    error: Option<PluginError>,
    /// Number of initial calls that fail with `Unreachable`.
    transient_failures: u64,
    /// Simulated latency for scans.
    latency: Option<Duration>,
    /// Counter for scan calls.
    scan_count: AtomicU64,
    /// Status reported by `health`.
    health: RwLock<HealthStatus>,
}

impl MockPlugin {
    /// Creates a healthy mock plugin that reports no findings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            findings: RwLock::new(Vec::new()),
            error: None,
            transient_failures: 0,
            latency: None,
            scan_count: AtomicU64::new(0),
            health: RwLock::new(HealthStatus::Healthy),
        }
    }

    /// Adds a finding reported by every scan.
    pub fn with_finding(
        self,
        vulnerability_type: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
        confidence: f32,
    ) -> Self {
        let finding =
            VulnerabilityFinding::new(vulnerability_type, severity, location, self.name.clone())
                .with_confidence(confidence);
        self.findings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(finding);
        self
    }

    /// Makes every scan fail with `error`.
    pub fn with_error(mut self, error: PluginError) -> Self {
        self.error = Some(error);
        self
    }

    /// Makes the first `count` scans fail with `Unreachable`.
    pub fn with_transient_failures(mut self, count: u64) -> Self {
        self.transient_failures = count;
        self
    }

    /// Sets the simulated latency for scans.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the status reported by health probes.
    pub fn with_health(self, status: HealthStatus) -> Self {
        self.set_health(status);
        self
    }

    /// Changes the status reported by health probes.
    pub fn set_health(&self, status: HealthStatus) {
        *self
            .health
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    /// Returns the number of scans submitted.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ScannerPlugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health(&self) -> HealthStatus {
        *self
            .health
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn submit_scan(
        &self,
        _target: &Target,
        _config: &ScanConfig,
    ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
        let call = self.scan_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if call < self.transient_failures {
            return Err(PluginError::unreachable("simulated transient failure"));
        }

        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        Ok(self
            .findings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }
}
