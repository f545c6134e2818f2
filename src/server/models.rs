//! Request and response bodies for the HTTP API.

use crate::aggregator::FindingSummary;
use crate::core::{
    AggregatedFinding, JobStatus, PluginOutcome, ScanConfig, ScanJob, ScanType, Target,
    TargetType,
};
use crate::orchestrator::OrchestratorConfig;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// `POST /api/v1/scan` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Address, file path or bytecode.
    pub target_identifier: String,
    /// Kind of target.
    pub target_type: TargetType,
    /// Requested analysis style.
    pub scan_type: ScanType,
    /// Restrict dispatch to these plugins.
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Chain label, "ethereum" when omitted.
    #[serde(default)]
    pub blockchain: Option<String>,
    /// Job deadline override.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Fan-out bound override.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl ScanRequest {
    /// Splits the request into a target and a scan configuration, filling
    /// unset values from `defaults`.
    pub fn into_parts(self, defaults: &OrchestratorConfig) -> (Target, ScanConfig) {
        let mut target = Target::new(self.target_identifier, self.target_type);
        if let Some(chain) = self.blockchain {
            target = target.with_blockchain(chain);
        }

        let mut config = defaults.scan_config(self.scan_type).with_plugins(self.plugins);
        if let Some(seconds) = self.timeout_seconds {
            config = config.with_timeout_seconds(seconds);
        }
        if let Some(max) = self.max_concurrency {
            config = config.with_max_concurrency(max);
        }

        (target, config)
    }
}

/// `202` answer to a scan submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAccepted {
    /// Id to poll.
    pub scan_id: Uuid,
    /// Status at acceptance.
    pub status: JobStatus,
}

/// `GET /api/v1/scan/{scan_id}/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    /// Job id.
    pub scan_id: Uuid,
    /// Lifecycle state.
    pub status: JobStatus,
    /// What is scanned.
    pub target: Target,
    /// Requested analysis style.
    pub scan_type: ScanType,
    /// Plugins selected for dispatch.
    pub dispatched_plugins: Vec<String>,
    /// Outcomes recorded so far, by plugin name.
    pub per_plugin_results: BTreeMap<String, PluginOutcome>,
    /// Acceptance time.
    pub created_at: DateTime<Utc>,
    /// Dispatch start.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ScanJob> for ScanStatusResponse {
    fn from(job: ScanJob) -> Self {
        Self {
            scan_id: job.id,
            status: job.status,
            scan_type: job.config.scan_type,
            target: job.target,
            dispatched_plugins: job.dispatched_plugins,
            per_plugin_results: job.per_plugin_results.into_iter().collect(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// `GET /api/v1/scan/{scan_id}/results` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResultsResponse {
    /// Job id.
    pub scan_id: Uuid,
    /// Terminal state.
    pub status: JobStatus,
    /// Deduplicated findings, most severe first.
    pub findings: Vec<AggregatedFinding>,
    /// Counts over `findings`.
    pub summary: FindingSummary,
}

impl ScanResultsResponse {
    pub(crate) fn new(scan_id: Uuid, status: JobStatus, findings: Vec<AggregatedFinding>) -> Self {
        let summary = FindingSummary::from_findings(&findings);
        Self {
            scan_id,
            status,
            findings,
            summary,
        }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}
