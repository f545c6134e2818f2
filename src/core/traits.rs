//! Core traits for the scanhub library.
//!
//! This module defines the `ScannerPlugin` capability that every scanner
//! plugin implements.

use crate::core::error::PluginError;
use crate::core::types::{HealthStatus, ScanConfig, Target, VulnerabilityFinding};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// The capability every scanner plugin provides.
///
/// Plugins are selected from the registry by descriptor and driven only
/// through this trait, whether they sit behind HTTP or live in-process.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; the orchestrator calls them from
///   concurrently running tasks.
/// - `health` never fails: any problem is reported as `Unhealthy`.
/// - `submit_scan` returns every failure as a `PluginError` and never panics.
///   The orchestrator applies the scan deadline on top of whatever timeout
///   the plugin enforces itself.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanhub::core::{HealthStatus, PluginError, ScanConfig, ScannerPlugin, Target, VulnerabilityFinding};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Echidna;
///
/// #[async_trait]
/// impl ScannerPlugin for Echidna {
///     fn name(&self) -> &str {
///         "echidna"
///     }
///
///     async fn health(&self) -> HealthStatus {
///         HealthStatus::Healthy
///     }
///
///     async fn submit_scan(
///         &self,
///         target: &Target,
///         config: &ScanConfig,
///     ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait ScannerPlugin: Send + Sync + Debug {
    /// Returns the plugin name, e.g. "slither".
    ///
    /// This must match the name of the descriptor it is registered under.
    fn name(&self) -> &str;

    /// Probes the plugin.
    async fn health(&self) -> HealthStatus;

    /// Runs a scan and returns the findings, each stamped with this plugin's
    /// name as `source_plugin`.
    async fn submit_scan(
        &self,
        target: &Target,
        config: &ScanConfig,
    ) -> Result<Vec<VulnerabilityFinding>, PluginError>;
}

/// An arc-wrapped plugin for shared ownership.
pub type ArcPlugin = Arc<dyn ScannerPlugin>;
