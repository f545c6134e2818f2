//! Core types and traits for the scanhub library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Targets, scan configuration, severities, findings
//! - [`job`] - Scan jobs, their lifecycle and per-plugin outcomes
//! - [`traits`] - The `ScannerPlugin` capability
//! - [`error`] - Structured error types

pub mod error;
pub mod job;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use error::{
    OrchestratorError, OrchestratorResult, PluginError, RegistryError, RegistryResult,
};
pub use job::{JobStatus, PluginOutcome, ScanJob};
pub use traits::{ArcPlugin, ScannerPlugin};
pub use types::{
    clamp_confidence, AggregatedFinding, HealthStatus, ScanConfig, ScanType, Severity, Target,
    TargetType, VulnerabilityFinding, DEFAULT_CONFIDENCE,
};
