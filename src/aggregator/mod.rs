//! Result aggregation.
//!
//! Plugins often agree on the same issue. The aggregator collapses those
//! reports into one finding per issue and records which plugins saw it.
//! Everything here is pure.

mod merge;
mod summary;

pub use merge::{aggregate, aggregate_job, merge};
pub use summary::FindingSummary;
