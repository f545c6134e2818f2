//! Circuit breaker for scanner plugins.
//!
//! A plugin that keeps timing out or refusing connections would otherwise
//! hold a concurrency slot until the scan deadline on every job. The
//! breaker fails such calls fast and periodically probes for recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through.
//! - **Open**: Plugin is failing; calls are rejected immediately.
//! - **Half-Open**: Probing the plugin to see if it has recovered.

mod breaker;
mod config;
mod state;

pub use breaker::CircuitBreaker;
pub use config::{CircuitBreakerConfig, FailurePolicy};
pub use state::{BreakerMetrics, BreakerState};
