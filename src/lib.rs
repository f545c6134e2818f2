//! # Scanhub
//!
//! Orchestration of smart-contract vulnerability scanners with health
//! tracking, circuit breakers, bounded fan-out and cross-plugin finding
//! deduplication.
//!
//! ## Overview
//!
//! Analysis tools such as Slither, Mythril or Manticore run as isolated
//! HTTP services ("plugins"). Scanhub lets you:
//!
//! - Register plugins and keep their health current
//! - Submit a target and have it fanned out to every eligible plugin
//! - Track the scan job until each plugin has produced findings or an error
//! - Merge the findings of all plugins into one deduplicated list
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanhub::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(PluginRegistry::new());
//!     registry.register_plugin(
//!         PluginDescriptor::new("slither", "http://slither:8080")
//!             .with_scan_type(ScanType::Static),
//!         HttpPlugin::new(HttpPluginConfig::new("slither", "http://slither:8080"))?,
//!     );
//!     probe_all(&registry, std::time::Duration::from_secs(5)).await;
//!
//!     let orchestrator = ScanOrchestrator::builder().with_registry(registry).build();
//!     let job = orchestrator
//!         .run_scan(Target::file("contracts/Vault.sol"), ScanConfig::new(ScanType::Static))
//!         .await?;
//!
//!     for finding in orchestrator.results(job.id)?.unwrap_or_default() {
//!         println!("{} at {} ({})", finding.vulnerability_type, finding.location, finding.severity);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the HTTP plugin client
//! - `http` - [`plugins::HttpPlugin`] via `reqwest`
//! - `server` - Settings loading, the axum API and the `scanhub` binary
//!
//! ## Architecture
//!
//! - **Core**: Targets, findings, scan jobs, errors, the plugin trait
//! - **Plugins**: HTTP client and an in-process mock
//! - **Circuit Breaker**: Fail-fast wrapper for misbehaving plugins
//! - **Registry**: Configured plugins and their health
//! - **Orchestrator**: Job lifecycle and bounded fan-out
//! - **Aggregator**: Cross-plugin deduplication
//! - **Audit**: Structured audit events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aggregator;
pub mod audit;
pub mod circuit_breaker;
pub mod core;
pub mod orchestrator;
pub mod plugins;
pub mod registry;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod logging;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types at the crate root
pub use crate::core::{
    AggregatedFinding, HealthStatus, JobStatus, OrchestratorError, PluginError, PluginOutcome,
    RegistryError, ScanConfig, ScanJob, ScanType, ScannerPlugin, Severity, Target, TargetType,
    VulnerabilityFinding,
};

pub use crate::aggregator::{aggregate, FindingSummary};
pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use crate::orchestrator::{OrchestratorConfig, ScanOrchestrator};
pub use crate::registry::{PluginDescriptor, PluginRegistry};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanhub::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregator::{aggregate, aggregate_job, merge, FindingSummary};
    pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    pub use crate::core::{
        AggregatedFinding, ArcPlugin, HealthStatus, JobStatus, OrchestratorError, PluginError,
        PluginOutcome, RegistryError, ScanConfig, ScanJob, ScanType, ScannerPlugin, Severity,
        Target, TargetType, VulnerabilityFinding,
    };
    pub use crate::orchestrator::{OrchestratorConfig, RetryConfig, ScanOrchestrator};
    #[cfg(feature = "http")]
    pub use crate::plugins::{HttpPlugin, HttpPluginConfig};
    pub use crate::plugins::MockPlugin;
    pub use crate::registry::{
        probe_all, HealthMonitor, PluginDescriptor, PluginHandle, PluginRegistry,
    };
}
