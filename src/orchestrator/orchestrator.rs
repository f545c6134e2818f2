//! The scan orchestrator implementation.

use crate::aggregator;
use crate::core::{
    AggregatedFinding, OrchestratorError, OrchestratorResult, PluginError, PluginOutcome,
    ScanConfig, ScanJob, ScanType, Target,
};
use crate::orchestrator::retry::{retry_async, RetryConfig};
use crate::orchestrator::store::JobStore;
use crate::registry::{PluginHandle, PluginRegistry};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

/// Longest job deadline a request may ask for (one week).
pub const MAX_TIMEOUT_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Configuration for the scan orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Job deadline used when a request does not set one.
    pub default_timeout_seconds: u64,

    /// Fan-out bound used when a request does not set one.
    pub default_max_concurrency: usize,

    /// Retry policy for recoverable plugin errors.
    pub retry: RetryConfig,

    /// How often [`ScanOrchestrator::wait_for_completion`] polls the store.
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let scan = ScanConfig::default();
        Self {
            default_timeout_seconds: scan.timeout_seconds,
            default_max_concurrency: scan.max_concurrency,
            retry: RetryConfig::no_retry(),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default job deadline.
    pub fn with_default_timeout_seconds(mut self, seconds: u64) -> Self {
        self.default_timeout_seconds = seconds;
        self
    }

    /// Sets the default fan-out bound.
    pub fn with_default_max_concurrency(mut self, max: usize) -> Self {
        self.default_max_concurrency = max.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the completion poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns a scan configuration for `scan_type` carrying these defaults.
    pub fn scan_config(&self, scan_type: ScanType) -> ScanConfig {
        ScanConfig::new(scan_type)
            .with_timeout_seconds(self.default_timeout_seconds)
            .with_max_concurrency(self.default_max_concurrency)
    }
}

/// Builder for creating a `ScanOrchestrator`.
#[derive(Debug, Default)]
pub struct ScanOrchestratorBuilder {
    registry: Option<Arc<PluginRegistry>>,
    config: OrchestratorConfig,
}

impl ScanOrchestratorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a shared plugin registry.
    pub fn with_registry(mut self, registry: Arc<PluginRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the orchestrator. Without a registry an empty one is created.
    pub fn build(self) -> Arc<ScanOrchestrator> {
        Arc::new(ScanOrchestrator {
            registry: self.registry.unwrap_or_default(),
            store: JobStore::new(),
            config: self.config,
        })
    }
}

/// Accepts scan requests, fans them out to plugins and tracks the jobs.
///
/// The orchestrator is shared by handle: [`start_scan`](Self::start_scan)
/// spawns the dispatch in the background and that task keeps its own
/// `Arc` to the orchestrator until the job is finished.
///
/// # Example
///
/// ```rust,ignore
/// use scanhub::prelude::*;
///
/// let registry = Arc::new(PluginRegistry::new());
/// registry.register_plugin(descriptor, MockPlugin::new("slither"));
///
/// let orchestrator = ScanOrchestrator::builder().with_registry(registry).build();
/// let job = orchestrator
///     .run_scan(Target::address("0xABC"), ScanConfig::new(ScanType::Static))
///     .await?;
/// let findings = orchestrator.results(job.id)?;
/// ```
#[derive(Debug)]
pub struct ScanOrchestrator {
    registry: Arc<PluginRegistry>,
    store: JobStore,
    config: OrchestratorConfig,
}

impl ScanOrchestrator {
    /// Creates a new builder.
    pub fn builder() -> ScanOrchestratorBuilder {
        ScanOrchestratorBuilder::new()
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Accepts a scan request and starts dispatching it in the background.
    ///
    /// Returns the job as it stands after plugin selection: `Running`, or
    /// already `Completed` when no plugin is eligible.
    pub async fn start_scan(
        self: &Arc<Self>,
        target: Target,
        config: ScanConfig,
    ) -> OrchestratorResult<ScanJob> {
        validate(&target, &config)?;

        let mut job = ScanJob::new(target, config);
        let selected = self.select(&job.config);
        job.start(selected.iter().map(|h| h.name().to_string()).collect());

        crate::audit::emit_scan_started(&job);

        if selected.is_empty() {
            tracing::info!(
                job_id = %job.id,
                scan_type = %job.config.scan_type,
                "No eligible plugins, completing scan immediately"
            );
            job.finish(no_outcome);
            crate::audit::emit_scan_completed(&job);
            self.store.insert(job.clone());
            return Ok(job);
        }

        self.store.insert(job.clone());

        let this = Arc::clone(self);
        let (id, target, config) = (job.id, job.target.clone(), job.config.clone());
        tokio::spawn(async move {
            let limit = config.timeout();
            let timed_out = AssertUnwindSafe(this.dispatch(id, target, config, selected))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(job_id = %id, "Dispatch panicked, closing scan");
                    false
                });
            this.finish(id, timed_out, limit);
        });

        Ok(job)
    }

    /// Runs a scan to completion and returns the finished job.
    pub async fn run_scan(
        self: &Arc<Self>,
        target: Target,
        config: ScanConfig,
    ) -> OrchestratorResult<ScanJob> {
        let job = self.start_scan(target, config).await?;
        self.wait_for_completion(job.id).await
    }

    /// Returns a snapshot of the job.
    pub fn get_status(&self, job_id: Uuid) -> OrchestratorResult<ScanJob> {
        self.store
            .get(&job_id)
            .ok_or(OrchestratorError::UnknownScanJob { id: job_id })
    }

    /// Waits until the job reaches a terminal state.
    pub async fn wait_for_completion(&self, job_id: Uuid) -> OrchestratorResult<ScanJob> {
        loop {
            let job = self.get_status(job_id)?;
            if job.is_finished() {
                return Ok(job);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Returns the aggregated findings of a finished job, or `None` while
    /// the job is still running.
    pub fn results(&self, job_id: Uuid) -> OrchestratorResult<Option<Vec<AggregatedFinding>>> {
        let job = self.get_status(job_id)?;
        Ok(job
            .is_finished()
            .then(|| aggregator::aggregate_job(&job)))
    }

    /// Returns snapshots of every known job, oldest first.
    pub fn list_jobs(&self) -> Vec<ScanJob> {
        self.store.list()
    }

    /// Forgets a finished job.
    pub fn purge(&self, job_id: Uuid) -> OrchestratorResult<ScanJob> {
        let job = self.get_status(job_id)?;
        if !job.is_finished() {
            return Err(OrchestratorError::invalid(format!(
                "scan {} is still running",
                job_id
            )));
        }
        self.store
            .remove(&job_id)
            .ok_or(OrchestratorError::UnknownScanJob { id: job_id })
    }

    /// Healthy plugins for the scan type, narrowed by `enabled_plugins`.
    fn select(&self, config: &ScanConfig) -> Vec<PluginHandle> {
        self.registry
            .select(config.scan_type)
            .into_iter()
            .filter(|handle| config.allows_plugin(handle.name()))
            .collect()
    }

    /// Fans the scan out and records outcomes until every plugin has
    /// answered or the deadline passes. Returns `true` on deadline.
    async fn dispatch(
        &self,
        job_id: Uuid,
        target: Target,
        config: ScanConfig,
        selected: Vec<PluginHandle>,
    ) -> bool {
        let deadline = deadline_after(config.timeout());
        let job_slots = Arc::new(Semaphore::new(
            config.effective_concurrency().min(selected.len()),
        ));
        let target = Arc::new(target);
        let config = Arc::new(config);

        let mut tasks = JoinSet::new();
        for handle in selected {
            let job_slots = Arc::clone(&job_slots);
            let target = Arc::clone(&target);
            let config = Arc::clone(&config);
            let retry = self.config.retry.clone();

            tasks.spawn(async move {
                let name = handle.name().to_string();
                let Ok(_job_slot) = job_slots.acquire_owned().await else {
                    return (name, Err(PluginError::reported("dispatch cancelled")));
                };
                let Some(_plugin_slot) = handle.acquire().await else {
                    return (name, Err(PluginError::reported("dispatch cancelled")));
                };

                let seconds = handle.descriptor.call_timeout_seconds(config.timeout_seconds);
                let limit = Duration::from_secs(seconds);
                let plugin_config = config.as_ref().clone().with_timeout_seconds(seconds);

                tracing::debug!(
                    job_id = %job_id,
                    plugin = %name,
                    timeout = ?limit,
                    "Submitting scan to plugin"
                );

                let (plugin, target, plugin_config) = (&handle.plugin, &*target, &plugin_config);
                let attempt = move || async move {
                    tokio::time::timeout(limit, plugin.submit_scan(target, plugin_config))
                        .await
                        .unwrap_or_else(|_| Err(PluginError::timeout(limit)))
                };
                let result = AssertUnwindSafe(retry_async(&retry, deadline, attempt))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(PluginError::reported("plugin call panicked")));
                (name, result)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((name, result)))) => self.record(job_id, &name, result.into()),
                Ok(Some(Err(e))) => {
                    tracing::error!(job_id = %job_id, error = %e, "Dispatch task failed");
                }
                Ok(None) => return false,
                Err(_) => {
                    tasks.shutdown().await;
                    return true;
                }
            }
        }
    }

    /// Closes the job, marking plugins without an outcome.
    fn finish(&self, job_id: Uuid, timed_out: bool, limit: Duration) {
        let finished = self.store.update(&job_id, |job| {
            if timed_out {
                tracing::warn!(
                    job_id = %job_id,
                    outstanding = ?job.outstanding_plugins(),
                    "Scan deadline expired"
                );
                job.finish(|_| PluginError::timeout(limit));
            } else {
                job.finish(no_outcome);
            }
            job.clone()
        });

        match finished {
            Some(job) => {
                tracing::info!(
                    job_id = %job_id,
                    status = %job.status,
                    plugins = job.dispatched_plugins.len(),
                    failed = job.failed_plugins().len(),
                    "Scan finished"
                );
                crate::audit::emit_scan_completed(&job);
            }
            None => tracing::debug!(job_id = %job_id, "Scan job purged during dispatch"),
        }
    }

    fn record(&self, job_id: Uuid, plugin: &str, outcome: PluginOutcome) {
        crate::audit::emit_plugin_completed(&job_id, plugin, &outcome);
        match self.store.update(&job_id, |job| job.record(plugin, outcome)) {
            Some(true) => {}
            Some(false) => {
                tracing::debug!(job_id = %job_id, plugin = %plugin, "Ignoring duplicate outcome");
            }
            None => tracing::debug!(job_id = %job_id, "Scan job purged during dispatch"),
        }
    }
}

fn validate(target: &Target, config: &ScanConfig) -> OrchestratorResult<()> {
    if target.identifier.trim().is_empty() {
        return Err(OrchestratorError::invalid("target identifier must not be empty"));
    }
    if config.timeout_seconds == 0 {
        return Err(OrchestratorError::invalid(
            "timeout_seconds must be greater than zero",
        ));
    }
    if config.timeout_seconds > MAX_TIMEOUT_SECONDS {
        return Err(OrchestratorError::invalid(format!(
            "timeout_seconds must not exceed {}",
            MAX_TIMEOUT_SECONDS
        )));
    }
    Ok(())
}

fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(MAX_TIMEOUT_SECONDS))
}

fn no_outcome(plugin: &str) -> PluginError {
    PluginError::reported(format!("no outcome recorded for plugin '{}'", plugin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HealthStatus, JobStatus, Severity};
    use crate::plugins::MockPlugin;
    use crate::registry::PluginDescriptor;

    fn descriptor(name: &str, scan_type: ScanType) -> PluginDescriptor {
        PluginDescriptor::new(name, "")
            .with_scan_type(scan_type)
            .with_health(HealthStatus::Healthy)
    }

    fn orchestrator_with(plugins: Vec<(PluginDescriptor, MockPlugin)>) -> Arc<ScanOrchestrator> {
        let registry = Arc::new(PluginRegistry::new());
        for (descriptor, plugin) in plugins {
            registry.register_plugin(descriptor, plugin);
        }
        ScanOrchestrator::builder().with_registry(registry).build()
    }

    fn target() -> Target {
        Target::address("0x5FbDB2315678afecb367f032d93F642f64180aa3")
    }

    #[tokio::test]
    async fn test_all_plugins_succeed() {
        let orchestrator = orchestrator_with(vec![
            (
                descriptor("slither", ScanType::Static),
                MockPlugin::new("slither").with_finding("reentrancy", Severity::High, "line 42", 0.9),
            ),
            (
                descriptor("mythril", ScanType::Static),
                MockPlugin::new("mythril"),
            ),
        ]);

        let job = orchestrator
            .run_scan(target(), ScanConfig::new(ScanType::Static))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.dispatched_plugins, vec!["slither", "mythril"]);
        assert_eq!(job.per_plugin_results.len(), 2);
        assert!(job.completed_at.is_some());
        assert_eq!(orchestrator.results(job.id).unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_and_failed() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (
                descriptor("mythril", ScanType::Static),
                MockPlugin::new("mythril").with_error(PluginError::reported("solc missing")),
            ),
        ]);

        let partial = orchestrator
            .run_scan(target(), ScanConfig::new(ScanType::Static))
            .await
            .unwrap();
        assert_eq!(partial.status, JobStatus::Partial);
        assert_eq!(partial.failed_plugins(), vec!["mythril"]);

        let failed = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_plugin("mythril"),
            )
            .await
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.dispatched_plugins, vec!["mythril"]);
    }

    #[tokio::test]
    async fn test_no_eligible_plugins_completes_immediately() {
        let orchestrator = orchestrator_with(vec![(
            descriptor("slither", ScanType::Static),
            MockPlugin::new("slither"),
        )]);

        let job = orchestrator
            .start_scan(target(), ScanConfig::new(ScanType::Fuzzing))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.per_plugin_results.is_empty());
        assert_eq!(orchestrator.get_status(job.id).unwrap().status, JobStatus::Completed);
        assert_eq!(orchestrator.results(job.id).unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_start_scan_returns_running_job() {
        let orchestrator = orchestrator_with(vec![(
            descriptor("manticore", ScanType::Dynamic),
            MockPlugin::new("manticore").with_latency(Duration::from_millis(100)),
        )]);

        let job = orchestrator
            .start_scan(target(), ScanConfig::new(ScanType::Dynamic))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(orchestrator.results(job.id).unwrap().is_none());

        let done = orchestrator.wait_for_completion(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_deadline_records_timeouts() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (
                descriptor("mythril", ScanType::Static),
                MockPlugin::new("mythril").with_latency(Duration::from_secs(30)),
            ),
        ]);

        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_timeout_seconds(1),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Partial);
        assert!(job.per_plugin_results["mythril"]
            .error()
            .is_some_and(PluginError::is_timeout));
        assert!(job.per_plugin_results["slither"].is_success());
    }

    #[tokio::test]
    async fn test_enabled_plugins_filter() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (descriptor("mythril", ScanType::Static), MockPlugin::new("mythril")),
        ]);

        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_plugins(["mythril", "echidna"]),
            )
            .await
            .unwrap();

        assert_eq!(job.dispatched_plugins, vec!["mythril"]);
    }

    #[tokio::test]
    async fn test_unhealthy_plugins_are_skipped() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (
                descriptor("mythril", ScanType::Static).with_health(HealthStatus::Unhealthy),
                MockPlugin::new("mythril"),
            ),
        ]);

        let job = orchestrator
            .run_scan(target(), ScanConfig::new(ScanType::Static))
            .await
            .unwrap();
        assert_eq!(job.dispatched_plugins, vec!["slither"]);
    }

    #[tokio::test]
    async fn test_retry_recovers_unreachable_plugin() {
        let registry = Arc::new(PluginRegistry::new());
        registry.register_plugin(
            descriptor("slither", ScanType::Static),
            MockPlugin::new("slither").with_transient_failures(2),
        );
        let orchestrator = ScanOrchestrator::builder()
            .with_registry(registry)
            .with_config(
                OrchestratorConfig::new().with_retry(
                    RetryConfig::new()
                        .with_max_attempts(3)
                        .with_initial_delay(Duration::from_millis(1)),
                ),
            )
            .build();

        let job = orchestrator
            .run_scan(target(), ScanConfig::new(ScanType::Static))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let orchestrator = orchestrator_with(Vec::new());

        let err = orchestrator
            .start_scan(Target::address("  "), ScanConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidRequest { .. }));

        let err = orchestrator
            .start_scan(target(), ScanConfig::default().with_timeout_seconds(0))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidRequest { .. }));

        let err = orchestrator
            .start_scan(target(), ScanConfig::default().with_timeout_seconds(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidRequest { .. }));
        assert!(orchestrator.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_longest_timeout_is_accepted() {
        let orchestrator = orchestrator_with(vec![(
            descriptor("slither", ScanType::Static),
            MockPlugin::new("slither"),
        )]);

        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_timeout_seconds(MAX_TIMEOUT_SECONDS),
            )
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_unbounded_concurrency_request_completes() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (descriptor("mythril", ScanType::Static), MockPlugin::new("mythril")),
        ]);

        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_max_concurrency(usize::MAX),
            )
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.per_plugin_results.len(), 2);
    }

    #[tokio::test]
    async fn test_panicking_plugin_is_recorded() {
        #[derive(Debug)]
        struct Broken;

        #[async_trait::async_trait]
        impl crate::core::ScannerPlugin for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            async fn health(&self) -> HealthStatus {
                HealthStatus::Healthy
            }

            async fn submit_scan(
                &self,
                _target: &Target,
                _config: &ScanConfig,
            ) -> Result<Vec<crate::core::VulnerabilityFinding>, PluginError> {
                panic!("analyzer crashed")
            }
        }

        let registry = Arc::new(PluginRegistry::new());
        registry.register_plugin(descriptor("broken", ScanType::Static), Broken);
        registry.register_plugin(descriptor("slither", ScanType::Static), MockPlugin::new("slither"));
        let orchestrator = ScanOrchestrator::builder().with_registry(registry).build();

        let job = orchestrator
            .run_scan(target(), ScanConfig::new(ScanType::Static))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Partial);
        assert_eq!(
            job.per_plugin_results["broken"].error(),
            Some(&PluginError::reported("plugin call panicked"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_plugin_timeout_fires_before_job_deadline() {
        let orchestrator = orchestrator_with(vec![
            (descriptor("slither", ScanType::Static), MockPlugin::new("slither")),
            (
                descriptor("mythril", ScanType::Static).with_timeout_seconds(1),
                MockPlugin::new("mythril").with_latency(Duration::from_secs(30)),
            ),
        ]);

        let started = Instant::now();
        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_timeout_seconds(60),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Partial);
        assert_eq!(
            job.per_plugin_results["mythril"].error(),
            Some(&PluginError::timeout(Duration::from_secs(1)))
        );
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plugin_concurrency_limit_spans_jobs() {
        let orchestrator = orchestrator_with(vec![(
            descriptor("manticore", ScanType::Dynamic).with_max_concurrency(1),
            MockPlugin::new("manticore").with_latency(Duration::from_secs(10)),
        )]);
        let config = ScanConfig::new(ScanType::Dynamic).with_timeout_seconds(15);

        let first = orchestrator.start_scan(target(), config.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = orchestrator.start_scan(target(), config).await.unwrap();

        let first = orchestrator.wait_for_completion(first.id).await.unwrap();
        let second = orchestrator.wait_for_completion(second.id).await.unwrap();

        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(second.status, JobStatus::Failed);
        assert!(second.per_plugin_results["manticore"]
            .error()
            .is_some_and(PluginError::is_timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plugins_queued_at_deadline_time_out() {
        let orchestrator = orchestrator_with(vec![
            (
                descriptor("slither", ScanType::Static),
                MockPlugin::new("slither").with_latency(Duration::from_secs(10)),
            ),
            (
                descriptor("mythril", ScanType::Static),
                MockPlugin::new("mythril").with_latency(Duration::from_secs(10)),
            ),
        ]);

        let started = Instant::now();
        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static)
                    .with_timeout_seconds(15)
                    .with_max_concurrency(1),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Partial);
        assert_eq!(job.per_plugin_results.len(), 2);
        let outcomes: Vec<_> = job.per_plugin_results.values().collect();
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|o| o.error().is_some_and(PluginError::is_timeout)));
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let orchestrator = orchestrator_with(Vec::new());
        let id = Uuid::new_v4();

        assert_eq!(
            orchestrator.get_status(id).unwrap_err(),
            OrchestratorError::UnknownScanJob { id }
        );
        assert!(orchestrator.results(id).is_err());
        assert!(orchestrator.purge(id).is_err());
    }

    #[tokio::test]
    async fn test_purge_finished_job() {
        let orchestrator = orchestrator_with(Vec::new());
        let job = orchestrator
            .run_scan(target(), ScanConfig::default())
            .await
            .unwrap();

        assert_eq!(orchestrator.list_jobs().len(), 1);
        assert_eq!(orchestrator.purge(job.id).unwrap().id, job.id);
        assert!(orchestrator.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_bound_serializes_dispatch() {
        let orchestrator = orchestrator_with(vec![
            (
                descriptor("a", ScanType::Static),
                MockPlugin::new("a").with_latency(Duration::from_millis(50)),
            ),
            (
                descriptor("b", ScanType::Static),
                MockPlugin::new("b").with_latency(Duration::from_millis(50)),
            ),
        ]);

        let started = std::time::Instant::now();
        let job = orchestrator
            .run_scan(
                target(),
                ScanConfig::new(ScanType::Static).with_max_concurrency(1),
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
