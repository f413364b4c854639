//! Circuit breaker implementation
//!
//! Rolling-window breaker: outcomes recorded in the closed state expire after
//! a configured span, and the circuit opens once both the volume threshold
//! and the error percentage are met. Every admitted call is additionally
//! bounded by a breaker-enforced execution timeout, independent of whatever
//! timeout the transport applies.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::CircuitBreakerConfig;
use crate::{Error, Result};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed (allowing requests)
    Closed,
    /// Circuit is open (rejecting requests)
    Open,
    /// Circuit is half-open (single probe in flight)
    HalfOpen,
}

/// Outcome of one admitted call, as recorded in the rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Timeout,
}

/// Admission decision for one call
enum Admission {
    /// Closed circuit, normal pass-through
    Pass,
    /// Half-open probe; its outcome decides the next state
    Probe,
    /// Open circuit, reject without invoking the protected call
    Rejected,
}

/// Timestamped outcomes covering the rolling window span
struct RollingWindow {
    span: Duration,
    samples: VecDeque<(Instant, Outcome)>,
}

/// Live counts over the rolling window
struct WindowCounts {
    total: u32,
    failures: u32,
}

impl RollingWindow {
    fn new(span: Duration) -> Self {
        Self {
            span,
            samples: VecDeque::new(),
        }
    }

    fn record(&mut self, outcome: Outcome, now: Instant) {
        self.prune(now);
        self.samples.push_back((now, outcome));
    }

    fn counts(&mut self, now: Instant) -> WindowCounts {
        self.prune(now);
        let total = u32::try_from(self.samples.len()).unwrap_or(u32::MAX);
        let failures = u32::try_from(
            self.samples
                .iter()
                .filter(|(_, o)| matches!(o, Outcome::Failure | Outcome::Timeout))
                .count(),
        )
        .unwrap_or(u32::MAX);
        WindowCounts { total, failures }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.samples.front() {
            if now.duration_since(at) > self.span {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

/// State with the data each phase carries
enum Inner {
    Closed { window: RollingWindow },
    Open { since: Instant },
    HalfOpen { probe_started: Instant },
}

/// Snapshot of breaker counters for observability
#[derive(Debug, Clone, Copy)]
pub struct BreakerMetrics {
    /// Current state
    pub state: CircuitState,
    /// Calls currently counted in the rolling window
    pub window_total: u32,
    /// Failures (including timeouts) currently in the rolling window
    pub window_failures: u32,
    /// Calls rejected while the circuit was open (lifetime)
    pub rejected: u64,
    /// Calls cancelled by the execution timeout (lifetime)
    pub timed_out: u64,
}

/// Circuit breaker for one logical operation key
pub struct CircuitBreaker {
    /// Operation key
    name: String,
    enabled: bool,
    volume_threshold: u32,
    error_percentage: u32,
    sleep_window: Duration,
    execution_timeout: Duration,
    rolling_window: Duration,
    inner: Mutex<Inner>,
    /// Lifetime rejection count (open-state rejections touch no window)
    rejected: AtomicU64,
    /// Lifetime execution-timeout count
    timed_out: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for an operation key
    #[must_use]
    pub fn new(name: &str, config: &CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            enabled: config.enabled,
            volume_threshold: config.request_volume_threshold,
            error_percentage: config.error_threshold_percentage,
            sleep_window: config.sleep_window,
            execution_timeout: config.execution_timeout,
            rolling_window: config.rolling_window,
            inner: Mutex::new(Inner::Closed {
                window: RollingWindow::new(config.rolling_window),
            }),
            rejected: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    /// Run a protected call through the breaker.
    ///
    /// Admission follows the current state; admitted calls are bounded by the
    /// execution timeout and their outcome feeds the state machine. 4xx
    /// results (`Error::ClientRequest`) are surfaced to the caller but never
    /// recorded as failures.
    ///
    /// # Errors
    ///
    /// Returns `CircuitOpen` when rejected, `ExecutionTimeout` when the
    /// deadline elapses, otherwise whatever the protected call returns.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.enabled {
            return f().await;
        }

        let probe = match self.try_acquire() {
            Admission::Rejected => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(operation = %self.name, "Circuit open, rejecting call");
                return Err(Error::CircuitOpen(self.name.clone()));
            }
            Admission::Probe => true,
            Admission::Pass => false,
        };

        match tokio::time::timeout(self.execution_timeout, f()).await {
            Ok(Ok(value)) => {
                self.record(Outcome::Success, probe);
                Ok(value)
            }
            Ok(Err(e)) if e.is_breaker_counted() => {
                self.record(Outcome::Failure, probe);
                Err(e)
            }
            Ok(Err(e)) => {
                // Client errors: the dependency answered, the request was bad.
                // Excluded from failure accounting; a probe answered with 4xx
                // still proves the dependency reachable.
                trace!(operation = %self.name, error = %e, "Uncounted outcome");
                if probe {
                    self.record(Outcome::Success, true);
                }
                Err(e)
            }
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                self.record(Outcome::Timeout, probe);
                Err(Error::ExecutionTimeout {
                    operation: self.name.clone(),
                    timeout: self.execution_timeout,
                })
            }
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        match *self.inner.lock() {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Snapshot counters for observability
    pub fn metrics(&self) -> BreakerMetrics {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let (state, window_total, window_failures) = match &mut *inner {
            Inner::Closed { window } => {
                let counts = window.counts(now);
                (CircuitState::Closed, counts.total, counts.failures)
            }
            Inner::Open { .. } => (CircuitState::Open, 0, 0),
            Inner::HalfOpen { .. } => (CircuitState::HalfOpen, 0, 0),
        };
        BreakerMetrics {
            state,
            window_total,
            window_failures,
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }

    fn try_acquire(&self) -> Admission {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match &*inner {
            Inner::Closed { .. } => {
                trace!(operation = %self.name, "Circuit closed, allowing call");
                Admission::Pass
            }
            Inner::Open { since } => {
                if now.duration_since(*since) >= self.sleep_window {
                    debug!(operation = %self.name, "Sleep window elapsed, admitting probe");
                    *inner = Inner::HalfOpen { probe_started: now };
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
            Inner::HalfOpen { probe_started } => {
                // One probe at a time. A probe whose future was dropped
                // without reporting can hold the slot no longer than the
                // execution timeout.
                if now.duration_since(*probe_started) > self.execution_timeout {
                    debug!(operation = %self.name, "Stale probe slot, admitting new probe");
                    *inner = Inner::HalfOpen { probe_started: now };
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    fn record(&self, outcome: Outcome, probe: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match &mut *inner {
            Inner::HalfOpen { .. } if probe => match outcome {
                Outcome::Success => {
                    info!(operation = %self.name, "Probe succeeded, closing circuit");
                    *inner = Inner::Closed {
                        window: RollingWindow::new(self.rolling_window),
                    };
                }
                Outcome::Failure | Outcome::Timeout => {
                    warn!(operation = %self.name, ?outcome, "Probe failed, reopening circuit");
                    *inner = Inner::Open { since: now };
                }
            },
            Inner::Closed { window } => {
                window.record(outcome, now);
                let counts = window.counts(now);
                if self.should_trip(&counts) {
                    warn!(
                        operation = %self.name,
                        total = counts.total,
                        failures = counts.failures,
                        "Error threshold crossed, opening circuit"
                    );
                    *inner = Inner::Open { since: now };
                }
            }
            // Outcome from a call admitted before a state change; the window
            // it belonged to no longer exists.
            Inner::Open { .. } | Inner::HalfOpen { .. } => {
                trace!(operation = %self.name, ?outcome, "Stale outcome ignored");
            }
        }
    }

    fn should_trip(&self, counts: &WindowCounts) -> bool {
        counts.total >= self.volume_threshold
            && u64::from(counts.failures) * 100 >= u64::from(counts.total) * u64::from(self.error_percentage)
    }
}
