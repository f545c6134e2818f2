//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::state::{BreakerMetrics, BreakerState};
use crate::core::{HealthStatus, PluginError, ScanConfig, ScannerPlugin, Target, VulnerabilityFinding};

use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Default)]
struct BreakerInner {
    state: BreakerState,
    metrics: BreakerMetrics,
}

/// A circuit breaker wrapped around a scanner plugin.
///
/// After `failure_threshold` consecutive counted failures the breaker opens
/// and scan submissions fail fast with `Unreachable` until `open_duration`
/// elapses. Then a limited number of trial calls are admitted; enough successes
/// close the circuit, any failure reopens it.
///
/// The wrapper is itself a `ScannerPlugin`, so it can be registered in
/// place of the plugin it protects.
///
/// # Example
///
/// ```rust,ignore
/// use scanhub::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
/// use scanhub::plugins::{HttpPlugin, HttpPluginConfig};
///
/// let plugin = HttpPlugin::new(HttpPluginConfig::new("mythril", "http://mythril:8080"))?;
/// let protected = CircuitBreaker::new(plugin, CircuitBreakerConfig::default());
/// ```
pub struct CircuitBreaker<P: ScannerPlugin> {
    inner: P,
    config: CircuitBreakerConfig,
    shared: Mutex<BreakerInner>,
}

impl<P: ScannerPlugin> CircuitBreaker<P> {
    /// Creates a new circuit breaker around `plugin`.
    pub fn new(plugin: P, config: CircuitBreakerConfig) -> Self {
        Self {
            inner: plugin,
            config,
            shared: Mutex::new(BreakerInner::default()),
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults(plugin: P) -> Self {
        Self::new(plugin, CircuitBreakerConfig::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the current state.
    pub fn state(&self) -> BreakerState {
        self.lock().state.clone()
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> BreakerMetrics {
        self.lock().metrics.clone()
    }

    /// Forces the circuit open.
    pub fn force_open(&self) {
        let mut guard = self.lock();
        guard.state = BreakerState::open_for(self.config.open_duration);
        guard.metrics.times_opened += 1;
    }

    /// Forces the circuit closed.
    pub fn force_close(&self) {
        self.lock().state = BreakerState::closed();
    }

    /// Returns a reference to the wrapped plugin.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Admits or rejects a call.
    ///
    /// A call admitted while half-open holds a trial slot until the returned
    /// guard is dropped, including when the call is cancelled.
    fn admit(&self) -> Result<Option<TrialSlot<'_, P>>, PluginError> {
        let mut guard = self.lock();

        match guard.state.clone() {
            BreakerState::Closed { .. } => Ok(None),

            BreakerState::Open { until } => {
                if Instant::now() >= until {
                    guard.state = BreakerState::HalfOpen {
                        success_count: 0,
                        probe_count: 1,
                    };
                    Ok(Some(TrialSlot { breaker: self }))
                } else {
                    guard.metrics.rejections += 1;
                    Err(PluginError::unreachable(format!(
                        "circuit breaker open for '{}', retry in {:?}",
                        self.inner.name(),
                        until.saturating_duration_since(Instant::now())
                    )))
                }
            }

            BreakerState::HalfOpen {
                success_count,
                probe_count,
            } => {
                if probe_count < self.config.half_open_max_probes {
                    guard.state = BreakerState::HalfOpen {
                        success_count,
                        probe_count: probe_count + 1,
                    };
                    Ok(Some(TrialSlot { breaker: self }))
                } else {
                    guard.metrics.rejections += 1;
                    Err(PluginError::unreachable(format!(
                        "circuit breaker half-open for '{}', trial call in flight",
                        self.inner.name()
                    )))
                }
            }
        }
    }

    fn release_trial(&self) {
        let mut guard = self.lock();
        if let BreakerState::HalfOpen {
            success_count,
            probe_count,
        } = guard.state.clone()
        {
            guard.state = BreakerState::HalfOpen {
                success_count,
                probe_count: probe_count.saturating_sub(1),
            };
        }
    }

    fn on_success(&self) {
        let mut guard = self.lock();
        guard.metrics.successes += 1;

        match guard.state.clone() {
            BreakerState::HalfOpen {
                success_count,
                probe_count,
            } => {
                if success_count + 1 >= self.config.success_threshold {
                    tracing::info!(plugin = self.inner.name(), "Circuit breaker closed");
                    guard.state = BreakerState::closed();
                } else {
                    guard.state = BreakerState::HalfOpen {
                        success_count: success_count + 1,
                        probe_count,
                    };
                }
            }
            BreakerState::Closed { .. } => guard.state = BreakerState::closed(),
            BreakerState::Open { .. } => {}
        }
    }

    fn on_failure(&self, error: &PluginError) {
        if !self.config.failure_policy.should_count(error) {
            return;
        }

        let mut guard = self.lock();
        guard.metrics.failures += 1;

        let trip = match guard.state.clone() {
            BreakerState::Closed { failure_count } => {
                if failure_count + 1 >= self.config.failure_threshold {
                    true
                } else {
                    guard.state = BreakerState::Closed {
                        failure_count: failure_count + 1,
                    };
                    false
                }
            }
            BreakerState::HalfOpen { .. } => true,
            BreakerState::Open { .. } => false,
        };

        if trip {
            guard.state = BreakerState::open_for(self.config.open_duration);
            guard.metrics.times_opened += 1;
            tracing::warn!(
                plugin = self.inner.name(),
                error = %error,
                open_for = ?self.config.open_duration,
                "Circuit breaker opened"
            );
        }
    }
}

/// A half-open trial slot, given back when dropped.
struct TrialSlot<'a, P: ScannerPlugin> {
    breaker: &'a CircuitBreaker<P>,
}

impl<P: ScannerPlugin> Drop for TrialSlot<'_, P> {
    fn drop(&mut self) {
        self.breaker.release_trial();
    }
}

impl<P: ScannerPlugin> fmt::Debug for CircuitBreaker<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("inner", &self.inner)
            .field("state", &self.state().name())
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl<P: ScannerPlugin> ScannerPlugin for CircuitBreaker<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health(&self) -> HealthStatus {
        // Probes always reach the plugin; they only move a half-open circuit.
        let status = self.inner.health().await;
        if self.state().is_half_open() {
            match status {
                HealthStatus::Healthy => self.on_success(),
                _ => self.on_failure(&PluginError::unreachable("health probe failed")),
            }
        }
        status
    }

    async fn submit_scan(
        &self,
        target: &Target,
        config: &ScanConfig,
    ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
        let _trial = self.admit()?;

        match self.inner.submit_scan(target, config).await {
            Ok(findings) => {
                self.on_success();
                Ok(findings)
            }
            Err(e) => {
                self.on_failure(&e);
                Err(e)
            }
        }
    }
}
