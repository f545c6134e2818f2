//! Audit event types and emission functions.

use crate::core::{HealthStatus, JobStatus, PluginOutcome, ScanJob};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit record of a finished scan job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// When the job finished.
    pub timestamp: DateTime<Utc>,

    /// Job id.
    pub scan_id: String,

    /// Scanned identifier.
    pub target: String,

    /// Chain label of the target.
    pub blockchain: String,

    /// Requested scan type.
    pub scan_type: String,

    /// Terminal status.
    pub status: JobStatus,

    /// One entry per dispatched plugin, in dispatch order.
    pub plugins: Vec<PluginSummary>,

    /// Wall-clock duration in milliseconds, if the job was started.
    pub duration_ms: Option<u64>,
}

/// What one plugin contributed to a scan, for audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin name.
    pub plugin: String,

    /// Number of findings, zero on error.
    pub findings: usize,

    /// Error kind, if the call failed.
    pub error: Option<String>,
}

impl PluginSummary {
    fn new(plugin: &str, outcome: &PluginOutcome) -> Self {
        Self {
            plugin: plugin.to_string(),
            findings: outcome.findings().map_or(0, <[_]>::len),
            error: outcome.error().map(|e| e.kind().to_string()),
        }
    }
}

impl From<&ScanJob> for ScanAuditEvent {
    fn from(job: &ScanJob) -> Self {
        let duration_ms = match (job.started_at, job.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        };

        Self {
            timestamp: job.completed_at.unwrap_or_else(Utc::now),
            scan_id: job.id.to_string(),
            target: job.target.identifier.clone(),
            blockchain: job.target.blockchain.clone(),
            scan_type: job.config.scan_type.to_string(),
            status: job.status,
            plugins: job
                .ordered_results()
                .map(|(name, outcome)| PluginSummary::new(name, outcome))
                .collect(),
            duration_ms,
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit record of a plugin health transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAuditEvent {
    /// When the transition was observed.
    pub timestamp: DateTime<Utc>,

    /// Plugin name.
    pub plugin: String,

    /// Status before the probe.
    pub previous: HealthStatus,

    /// Status after the probe.
    pub current: HealthStatus,
}

impl AuditEvent for HealthAuditEvent {
    fn event_type(&self) -> &'static str {
        "health_changed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a job entering dispatch.
pub fn emit_scan_started(job: &ScanJob) {
    tracing::info!(
        target: "scanhub::audit",
        event_type = "scan_started",
        scan_id = %job.id,
        target_identifier = %job.target.identifier,
        target_type = %job.target.target_type,
        blockchain = %job.target.blockchain,
        scan_type = %job.config.scan_type,
        plugins = ?job.dispatched_plugins,
        timeout_seconds = job.config.timeout_seconds,
        "Scan started"
    );
}

/// Emits an audit event for one plugin outcome.
pub fn emit_plugin_completed(job_id: &uuid::Uuid, plugin: &str, outcome: &PluginOutcome) {
    match outcome {
        PluginOutcome::Findings { findings } => tracing::info!(
            target: "scanhub::audit",
            event_type = "plugin_completed",
            scan_id = %job_id,
            plugin = %plugin,
            findings = findings.len(),
            "Plugin completed"
        ),
        PluginOutcome::Error { error } => tracing::warn!(
            target: "scanhub::audit",
            event_type = "plugin_completed",
            scan_id = %job_id,
            plugin = %plugin,
            error_kind = error.kind(),
            error = %error,
            "Plugin failed"
        ),
    }
}

/// Emits an audit event for a job reaching a terminal state.
pub fn emit_scan_completed(job: &ScanJob) {
    let event = ScanAuditEvent::from(job);
    let failed: Vec<&str> = event
        .plugins
        .iter()
        .filter(|p| p.error.is_some())
        .map(|p| p.plugin.as_str())
        .collect();

    tracing::info!(
        target: "scanhub::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        target_identifier = %event.target,
        scan_type = %event.scan_type,
        status = %event.status,
        plugin_count = event.plugins.len(),
        failed_plugins = ?failed,
        raw_findings = job.raw_finding_count(),
        duration_ms = ?event.duration_ms,
        "Scan completed"
    );
}

/// Emits an audit event for a plugin health transition.
pub fn emit_health_changed(plugin: &str, previous: HealthStatus, current: HealthStatus) {
    let event = HealthAuditEvent {
        timestamp: Utc::now(),
        plugin: plugin.to_string(),
        previous,
        current,
    };

    if current.is_healthy() {
        tracing::info!(
            target: "scanhub::audit",
            event_type = event.event_type(),
            plugin = %event.plugin,
            previous = %event.previous,
            current = %event.current,
            "Plugin health changed"
        );
    } else {
        tracing::warn!(
            target: "scanhub::audit",
            event_type = event.event_type(),
            plugin = %event.plugin,
            previous = %event.previous,
            current = %event.current,
            "Plugin health changed"
        );
    }
}
