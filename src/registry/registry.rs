//! The plugin registry.

use crate::core::{ArcPlugin, HealthStatus, RegistryError, RegistryResult, ScanType, ScannerPlugin};
use crate::registry::descriptor::PluginDescriptor;

use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
struct Entry {
    descriptor: PluginDescriptor,
    plugin: ArcPlugin,
    slots: Arc<Semaphore>,
}

impl Entry {
    fn new(descriptor: PluginDescriptor, plugin: ArcPlugin) -> Self {
        let slots = descriptor.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            descriptor,
            plugin,
            slots: Arc::new(Semaphore::new(slots)),
        }
    }

    fn handle(&self) -> PluginHandle {
        PluginHandle {
            descriptor: self.descriptor.clone(),
            plugin: Arc::clone(&self.plugin),
            slots: Arc::clone(&self.slots),
        }
    }
}

/// A plugin selected for dispatch.
///
/// Handles of the same registered plugin share its call slots, so the
/// plugin's `max_concurrency` holds across every running job.
#[derive(Debug, Clone)]
pub struct PluginHandle {
    /// Descriptor as of selection.
    pub descriptor: PluginDescriptor,

    /// The plugin to call.
    pub plugin: ArcPlugin,

    slots: Arc<Semaphore>,
}

impl PluginHandle {
    /// Returns the registered name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Waits for a free call slot on the plugin.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    /// Returns the number of call slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Configured plugins and their health.
///
/// One registry is owned by the service process and shared by handle
/// (`Arc<PluginRegistry>`). Scan dispatch reads it concurrently while the
/// health monitor writes to it on its own cadence, so access goes through
/// an `RwLock`. Lookups are linear scans; registries hold tens of plugins.
///
/// Plugins are kept in registration order, which is also the order in which
/// they are selected for dispatch.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a plugin under `descriptor`, replacing any plugin with the
    /// same name in place.
    pub fn register(&self, descriptor: PluginDescriptor, plugin: ArcPlugin) {
        if plugin.name() != descriptor.name {
            tracing::warn!(
                descriptor = %descriptor.name,
                plugin = plugin.name(),
                "Plugin name differs from descriptor name; descriptor name is used"
            );
        }

        let mut entries = self.write();
        let entry = Entry::new(descriptor, plugin);
        match entries
            .iter_mut()
            .find(|e| e.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => {
                tracing::info!(plugin = %entry.descriptor.name, "Replacing registered plugin");
                *existing = entry;
            }
            None => {
                tracing::info!(
                    plugin = %entry.descriptor.name,
                    scan_types = ?entry.descriptor.supported_scan_types,
                    "Registered plugin"
                );
                entries.push(entry);
            }
        }
    }

    /// Registers an owned plugin.
    pub fn register_plugin<P: ScannerPlugin + 'static>(&self, descriptor: PluginDescriptor, plugin: P) {
        self.register(descriptor, Arc::new(plugin));
    }

    /// Removes a plugin.
    pub fn unregister(&self, name: &str) -> RegistryResult<PluginDescriptor> {
        let mut entries = self.write();
        let index = entries
            .iter()
            .position(|e| e.descriptor.name == name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;
        Ok(entries.remove(index).descriptor)
    }

    /// Returns the descriptors of healthy plugins that can serve `scan_type`,
    /// in registration order.
    pub fn plugins_for(&self, scan_type: ScanType) -> Vec<PluginDescriptor> {
        self.read()
            .iter()
            .filter(|e| e.descriptor.is_eligible(scan_type))
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Like [`plugins_for`](Self::plugins_for), but hands out dispatch
    /// handles.
    pub fn select(&self, scan_type: ScanType) -> Vec<PluginHandle> {
        self.read()
            .iter()
            .filter(|e| e.descriptor.is_eligible(scan_type))
            .map(Entry::handle)
            .collect()
    }

    /// Records a probe result for `name` and stamps the check time.
    pub fn mark_health(&self, name: &str, status: HealthStatus) -> RegistryResult<()> {
        let mut entries = self.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.descriptor.name == name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;

        let previous = entry.descriptor.health_status;
        entry.descriptor.health_status = status;
        entry.descriptor.last_health_check_time = Some(Utc::now());
        drop(entries);

        if previous != status {
            crate::audit::emit_health_changed(name, previous, status);
        }
        Ok(())
    }

    /// Returns the descriptor registered under `name`.
    pub fn get(&self, name: &str) -> Option<PluginDescriptor> {
        self.read()
            .iter()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.descriptor.clone())
    }

    /// Returns every descriptor, in registration order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.read().iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Returns every plugin handle keyed by registered name.
    pub fn plugins(&self) -> Vec<(String, ArcPlugin)> {
        self.read()
            .iter()
            .map(|e| (e.descriptor.name.clone(), Arc::clone(&e.plugin)))
            .collect()
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::MockPlugin;

    fn descriptor(name: &str, scan_type: ScanType, health: HealthStatus) -> PluginDescriptor {
        PluginDescriptor::new(name, format!("http://{}:8080", name))
            .with_scan_type(scan_type)
            .with_health(health)
    }

    fn registry() -> PluginRegistry {
        let registry = PluginRegistry::new();
        registry.register_plugin(
            descriptor("slither", ScanType::Static, HealthStatus::Healthy),
            MockPlugin::new("slither"),
        );
        registry.register_plugin(
            descriptor("manticore", ScanType::Dynamic, HealthStatus::Healthy),
            MockPlugin::new("manticore"),
        );
        registry.register_plugin(
            descriptor("mythril", ScanType::Static, HealthStatus::Unhealthy),
            MockPlugin::new("mythril"),
        );
        registry
    }

    fn names(descriptors: &[PluginDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_plugins_for_filters_by_type_and_health() {
        let registry = registry();
        assert_eq!(names(&registry.plugins_for(ScanType::Static)), vec!["slither"]);
        assert_eq!(names(&registry.plugins_for(ScanType::Dynamic)), vec!["manticore"]);
        assert!(registry.plugins_for(ScanType::Fuzzing).is_empty());
        assert_eq!(
            names(&registry.plugins_for(ScanType::Full)),
            vec!["slither", "manticore"]
        );
    }

    #[test]
    fn test_full_capable_plugin_serves_any_type() {
        let registry = registry();
        registry.register_plugin(
            descriptor("mythx", ScanType::Full, HealthStatus::Healthy),
            MockPlugin::new("mythx"),
        );
        assert_eq!(names(&registry.plugins_for(ScanType::Fuzzing)), vec!["mythx"]);
    }

    #[test]
    fn test_mark_health() {
        let registry = registry();
        registry.mark_health("mythril", HealthStatus::Healthy).unwrap();
        assert!(registry.get("mythril").unwrap().last_health_check_time.is_some());
        assert_eq!(
            names(&registry.plugins_for(ScanType::Static)),
            vec!["slither", "mythril"]
        );
    }

    #[test]
    fn test_mark_health_unknown_plugin() {
        let registry = registry();
        let err = registry
            .mark_health("echidna", HealthStatus::Healthy)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotFound {
                name: "echidna".into()
            }
        );
    }

    #[test]
    fn test_register_replaces_in_place() {
        let registry = registry();
        registry.register_plugin(
            descriptor("slither", ScanType::Fuzzing, HealthStatus::Healthy),
            MockPlugin::new("slither"),
        );
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.descriptors()[0].name, "slither");
        assert!(registry.plugins_for(ScanType::Static).is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = registry();
        assert_eq!(registry.unregister("manticore").unwrap().name, "manticore");
        assert!(registry.get("manticore").is_none());
        assert!(registry.unregister("manticore").is_err());
    }

    #[tokio::test]
    async fn test_handles_share_call_slots() {
        let registry = PluginRegistry::new();
        registry.register_plugin(
            descriptor("slither", ScanType::Static, HealthStatus::Healthy).with_max_concurrency(2),
            MockPlugin::new("slither"),
        );

        let first = registry.select(ScanType::Static).remove(0);
        let second = registry.select(ScanType::Full).remove(0);
        assert_eq!(first.available_slots(), 2);

        let _held = first.acquire().await.unwrap();
        assert_eq!(second.available_slots(), 1);

        registry.mark_health("slither", HealthStatus::Healthy).unwrap();
        assert_eq!(registry.select(ScanType::Static)[0].available_slots(), 1);
    }

    #[tokio::test]
    async fn test_reregistering_resets_call_slots() {
        let registry = registry();
        let old = registry.select(ScanType::Static).remove(0);
        let _held = old.acquire().await.unwrap();
        assert_eq!(old.available_slots(), 0);

        registry.register_plugin(
            descriptor("slither", ScanType::Static, HealthStatus::Healthy).with_max_concurrency(3),
            MockPlugin::new("slither"),
        );
        assert_eq!(registry.select(ScanType::Static)[0].available_slots(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_and_health_updates() {
        let registry = Arc::new(registry());
        let mut tasks = Vec::new();

        for i in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for j in 0..100 {
                    if i == 0 {
                        let status = if j % 2 == 0 {
                            HealthStatus::Healthy
                        } else {
                            HealthStatus::Unhealthy
                        };
                        registry.mark_health("mythril", status).unwrap();
                    } else {
                        let selected = registry.select(ScanType::Static);
                        assert!(selected.iter().any(|h| h.name() == "slither"));
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len(), 3);
    }
}
