//! Circuit breaker state machine.

use serde::Serialize;
use std::time::{Duration, Instant};

/// The current state of a plugin's circuit breaker.
#[derive(Debug, Clone)]
pub enum BreakerState {
    /// Calls pass through; consecutive failures are counted.
    Closed {
        /// Number of consecutive counted failures.
        failure_count: u32,
    },

    /// Calls are rejected without reaching the plugin.
    Open {
        /// When the circuit may move to half-open.
        until: Instant,
    },

    /// A limited number of probe calls are let through.
    HalfOpen {
        /// Successful probes so far.
        success_count: u32,
        /// Probes currently in flight.
        probe_count: u32,
    },
}

impl BreakerState {
    /// Creates a new closed state.
    pub fn closed() -> Self {
        Self::Closed { failure_count: 0 }
    }

    /// Creates an open state lasting `duration` from now.
    pub fn open_for(duration: Duration) -> Self {
        Self::Open {
            until: Instant::now() + duration,
        }
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen { .. })
    }

    /// Returns how long an open circuit stays open, if open.
    pub fn remaining_open(&self) -> Option<Duration> {
        match self {
            Self::Open { until } => Some(until.saturating_duration_since(Instant::now())),
            _ => None,
        }
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen { .. } => "half_open",
        }
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Counters describing how a breaker has behaved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakerMetrics {
    /// Calls that reached the plugin and succeeded.
    pub successes: u64,
    /// Calls that reached the plugin and failed.
    pub failures: u64,
    /// Calls rejected because the circuit was open.
    pub rejections: u64,
    /// Times the circuit opened.
    pub times_opened: u64,
}

impl BreakerMetrics {
    /// Returns the share of plugin calls that failed (0.0 with no calls).
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.successes + self.failures;
        if attempted == 0 {
            return 0.0;
        }
        self.failures as f64 / attempted as f64
    }
}
