//! Scan orchestration.
//!
//! The `ScanOrchestrator` selects plugins for a request, fans the scan out
//! to them under a concurrency bound and a deadline, and records an outcome
//! for every plugin it dispatched to.

#[allow(clippy::module_inception)]
mod orchestrator;
mod retry;
mod store;

pub use orchestrator::{
    OrchestratorConfig, ScanOrchestrator, ScanOrchestratorBuilder, MAX_TIMEOUT_SECONDS,
};
pub use retry::{retry_async, RetryConfig};
pub use store::JobStore;
