//! Scanner plugin implementations.
//!
//! This module contains implementations of the `ScannerPlugin` trait.
//!
//! ## Available Plugins
//!
//! - [`mock`] - An in-process plugin for testing
//! - [`http`] - Any tool behind the plugin HTTP contract (requires `http` feature)
//!
//! ## Implementing a Custom Plugin
//!
//! In-process tools can implement `ScannerPlugin` directly:
//!
//! ```rust,ignore
//! use scanhub::core::{HealthStatus, PluginError, ScanConfig, ScannerPlugin, Target, VulnerabilityFinding};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyPlugin;
//!
//! #[async_trait]
//! impl ScannerPlugin for MyPlugin {
//!     fn name(&self) -> &str {
//!         "my-plugin"
//!     }
//!
//!     async fn health(&self) -> HealthStatus {
//!         HealthStatus::Healthy
//!     }
//!
//!     async fn submit_scan(
//!         &self,
//!         target: &Target,
//!         config: &ScanConfig,
//!     ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

pub mod mock;

#[cfg(feature = "http")]
pub mod http;

// Re-exports
pub use mock::MockPlugin;

#[cfg(feature = "http")]
pub use http::{HttpPlugin, HttpPluginConfig};
