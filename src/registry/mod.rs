//! Plugin registry and health tracking.
//!
//! The registry is the only mutable state shared between the health
//! monitor and scan dispatch.

mod descriptor;
mod health;
#[allow(clippy::module_inception)]
mod registry;

pub use descriptor::PluginDescriptor;
pub use health::{probe_all, HealthMonitor};
pub use registry::{PluginHandle, PluginRegistry};
