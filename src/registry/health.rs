//! Periodic plugin health probing.

use crate::core::HealthStatus;
use crate::registry::PluginRegistry;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Probes every registered plugin once, concurrently, and records the
/// results in the registry.
///
/// A probe that does not answer within `probe_timeout` counts as
/// `Unhealthy`. Returns the observed status per plugin.
pub async fn probe_all(
    registry: &PluginRegistry,
    probe_timeout: Duration,
) -> Vec<(String, HealthStatus)> {
    let probes = registry.plugins().into_iter().map(|(name, plugin)| async move {
        let status = tokio::time::timeout(probe_timeout, plugin.health())
            .await
            .unwrap_or(HealthStatus::Unhealthy);
        (name, status)
    });

    let results = join_all(probes).await;

    for (name, status) in &results {
        // The plugin may have been unregistered while the probe ran.
        if let Err(e) = registry.mark_health(name, *status) {
            tracing::debug!(plugin = %name, error = %e, "Dropping probe result");
        }
    }

    results
}

/// Background task that keeps registry health current.
///
/// The task stops when the monitor is dropped or shut down.
///
/// ```rust,ignore
/// let monitor = HealthMonitor::spawn(Arc::clone(&registry), Duration::from_secs(30));
/// // ...
/// monitor.shutdown();
/// ```
#[derive(Debug)]
pub struct HealthMonitor {
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawns the monitor. The first probe round runs immediately.
    pub fn spawn(registry: Arc<PluginRegistry>, interval: Duration) -> Self {
        let probe_timeout = interval.min(Duration::from_secs(10));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let results = probe_all(&registry, probe_timeout).await;
                let healthy = results.iter().filter(|(_, s)| s.is_healthy()).count();
                tracing::debug!(
                    plugins = results.len(),
                    healthy = healthy,
                    "Health probe round finished"
                );
            }
        });

        Self { handle }
    }

    /// Returns `true` while the probe loop is running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the probe loop.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScanType;
    use crate::plugins::MockPlugin;
    use crate::registry::PluginDescriptor;

    #[tokio::test]
    async fn test_probe_all_updates_registry() {
        let registry = PluginRegistry::new();
        registry.register_plugin(
            PluginDescriptor::new("slither", "").with_scan_type(ScanType::Static),
            MockPlugin::new("slither"),
        );
        registry.register_plugin(
            PluginDescriptor::new("manticore", "").with_scan_type(ScanType::Dynamic),
            MockPlugin::new("manticore").with_health(HealthStatus::Unhealthy),
        );

        let results = probe_all(&registry, Duration::from_secs(1)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            registry.get("slither").unwrap().health_status,
            HealthStatus::Healthy
        );
        assert_eq!(
            registry.get("manticore").unwrap().health_status,
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_monitor_tracks_health_changes() {
        let registry = Arc::new(PluginRegistry::new());
        let plugin = Arc::new(MockPlugin::new("slither").with_health(HealthStatus::Unhealthy));
        registry.register(
            PluginDescriptor::new("slither", "").with_scan_type(ScanType::Static),
            plugin.clone(),
        );

        let monitor = HealthMonitor::spawn(Arc::clone(&registry), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            registry.get("slither").unwrap().health_status,
            HealthStatus::Unhealthy
        );

        plugin.set_health(HealthStatus::Healthy);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            registry.get("slither").unwrap().health_status,
            HealthStatus::Healthy
        );

        assert!(monitor.is_running());
        monitor.shutdown();
    }
}
