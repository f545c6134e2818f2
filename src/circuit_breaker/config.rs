//! Circuit breaker configuration.

use crate::core::PluginError;
use std::time::Duration;

/// Configuration for a plugin circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive counted failures before the circuit opens.
    pub failure_threshold: u32,

    /// Successful probes in half-open state before the circuit closes.
    pub success_threshold: u32,

    /// How long the circuit stays open before probing.
    pub open_duration: Duration,

    /// Probes admitted while half-open.
    pub half_open_max_probes: u32,

    /// Which plugin errors count as failures.
    pub failure_policy: FailurePolicy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration: Duration::from_secs(30),
            half_open_max_probes: 1,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Sets the open duration.
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Sets the maximum number of half-open probes.
    pub fn with_half_open_max_probes(mut self, max: u32) -> Self {
        self.half_open_max_probes = max.max(1);
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Decides which plugin errors trip the breaker.
///
/// By default only errors that point at an unavailable plugin count. A
/// plugin that reports an error for one contract is still up.
#[derive(Debug, Clone)]
pub struct FailurePolicy {
    /// Count timeouts.
    pub count_timeouts: bool,
    /// Count unreachable plugins.
    pub count_unreachable: bool,
    /// Count malformed responses.
    pub count_malformed: bool,
    /// Count errors the plugin reported itself.
    pub count_reported: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            count_timeouts: true,
            count_unreachable: true,
            count_malformed: true,
            count_reported: false,
        }
    }
}

impl FailurePolicy {
    /// A policy that counts every error.
    pub fn all_errors() -> Self {
        Self {
            count_reported: true,
            ..Self::default()
        }
    }

    /// Determines if an error should be counted as a failure.
    pub fn should_count(&self, error: &PluginError) -> bool {
        match error {
            PluginError::Timeout { .. } => self.count_timeouts,
            PluginError::Unreachable { .. } => self.count_unreachable,
            PluginError::MalformedResponse { .. } => self.count_malformed,
            PluginError::PluginReportedError { .. } => self.count_reported,
        }
    }
}
