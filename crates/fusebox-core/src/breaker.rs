//! Circuit breaker implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::monitor;
use crate::types::{CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState};

/// Circuit breaker guarding calls to a single provider
///
/// Owns a background health reporting task spawned at construction, so a
/// breaker must be created inside a Tokio runtime. The task is cancelled by
/// [`destroy`](Self::destroy) or when the breaker is dropped.
pub struct CircuitBreaker {
    shared: Arc<BreakerShared>,
    /// Handle to the monitoring task; taken on destroy
    monitor: Mutex<Option<JoinHandle<()>>>,
}

/// Breaker state shared with the monitoring task
pub(crate) struct BreakerShared {
    /// Provider name (for logging and metrics)
    pub(crate) name: String,
    /// Configuration, fixed at construction
    pub(crate) config: CircuitBreakerConfig,
    /// State machine core. Each decide/record step locks it once and the
    /// lock is never held across an await, so in-flight operations of any
    /// duration cannot block each other's gate decisions.
    core: Mutex<BreakerCore>,
    /// Cumulative totals, readable without the core lock
    pub(crate) totals: Totals,
}

struct BreakerCore {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    last_success: Option<Instant>,
}

/// Lifetime counters; survive everything except process exit
#[derive(Default)]
pub(crate) struct Totals {
    pub(crate) requests: AtomicU64,
    pub(crate) successes: AtomicU64,
    pub(crate) failures: AtomicU64,
    pub(crate) rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let shared = Arc::new(BreakerShared {
            name: name.into(),
            config,
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure: None,
                last_success: None,
            }),
            totals: Totals::default(),
        });
        let handle = monitor::spawn(&shared);
        Self {
            shared,
            monitor: Mutex::new(Some(handle)),
        }
    }

    /// Get the provider name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Get the configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Get the current state
    ///
    /// Pure read: the open-to-half-open move only happens inside
    /// [`execute`](Self::execute), never here.
    pub fn state(&self) -> CircuitState {
        self.shared.core.lock().state
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Rejects immediately with [`CircuitBreakerError::Open`] while the
    /// circuit is open and the recovery timeout has not elapsed since the
    /// last failure. Otherwise the operation runs and its outcome is
    /// recorded; the result or error is forwarded unchanged. The breaker
    /// imposes no timeout on the operation.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.shared.totals.requests.fetch_add(1, Ordering::Relaxed);

        if !self.shared.try_acquire() {
            self.shared.totals.rejections.fetch_add(1, Ordering::Relaxed);
            return Err(CircuitBreakerError::Open {
                provider: self.shared.name.clone(),
            });
        }

        match operation().await {
            Ok(value) => {
                self.shared.record_success();
                Ok(value)
            }
            Err(e) => {
                self.shared.record_failure();
                Err(CircuitBreakerError::OperationFailed(e))
            }
        }
    }

    /// Get circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        self.shared.stats()
    }

    /// Manually reset the circuit breaker to closed state
    ///
    /// Clears the streak counters and timestamps. Cumulative totals are
    /// historical record and survive a reset.
    pub fn reset(&self) {
        let mut core = self.shared.core.lock();
        core.state = CircuitState::Closed;
        core.consecutive_failures = 0;
        core.consecutive_successes = 0;
        core.last_failure = None;
        core.last_success = None;
        drop(core);

        tracing::info!(
            provider = %self.shared.name,
            "circuit breaker manually reset"
        );
    }

    /// Manually open the circuit breaker, as if the failure threshold had
    /// been crossed. The recovery clock starts at the call.
    pub fn force_open(&self) {
        let mut core = self.shared.core.lock();
        core.last_failure = Some(Instant::now());
        self.shared.transition_to_open(&mut core);
        drop(core);

        tracing::warn!(
            provider = %self.shared.name,
            "circuit breaker manually forced open"
        );
    }

    /// Cancel the monitoring task; safe to call repeatedly
    pub fn destroy(&self) {
        if let Some(handle) = self.monitor.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for CircuitBreaker {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl BreakerShared {
    /// Decide phase: may the call proceed?
    ///
    /// The open-to-half-open transition happens here, synchronously, once
    /// the recovery timeout has elapsed since the last failure.
    fn try_acquire(&self) -> bool {
        let mut core = self.core.lock();
        match core.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                // No failure on record means the dwell is treated as served
                let dwell_served = core
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                if dwell_served {
                    self.transition_to_half_open(&mut core);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record phase for a successful outcome
    fn record_success(&self) {
        self.totals.successes.fetch_add(1, Ordering::Relaxed);

        let mut core = self.core.lock();
        core.last_success = Some(Instant::now());
        match core.state {
            CircuitState::Closed => {
                // A single success clears the failure streak
                core.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                core.consecutive_successes += 1;
                if core.consecutive_successes >= self.config.success_threshold {
                    self.transition_to_closed(&mut core);
                }
            }
            CircuitState::Open => {
                // Trial that outlived a concurrent trip; totals only
            }
        }
    }

    /// Record phase for a failed outcome
    fn record_failure(&self) {
        self.totals.failures.fetch_add(1, Ordering::Relaxed);

        let mut core = self.core.lock();
        core.last_failure = Some(Instant::now());
        match core.state {
            CircuitState::Closed => {
                core.consecutive_failures += 1;
                if core.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut core);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure in half-open state opens the circuit again
                self.transition_to_open(&mut core);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_open(&self, core: &mut BreakerCore) {
        core.state = CircuitState::Open;
        core.consecutive_successes = 0;

        tracing::warn!(
            provider = %self.name,
            consecutive_failures = core.consecutive_failures,
            "circuit breaker opened"
        );
    }

    fn transition_to_half_open(&self, core: &mut BreakerCore) {
        core.state = CircuitState::HalfOpen;
        core.consecutive_successes = 0;

        tracing::info!(
            provider = %self.name,
            "circuit breaker transitioning to half-open"
        );
    }

    fn transition_to_closed(&self, core: &mut BreakerCore) {
        core.state = CircuitState::Closed;
        core.consecutive_failures = 0;
        core.consecutive_successes = 0;

        tracing::info!(
            provider = %self.name,
            "circuit breaker closed"
        );
    }

    fn stats(&self) -> CircuitBreakerStats {
        let core = self.core.lock();
        CircuitBreakerStats {
            state: core.state,
            consecutive_failures: core.consecutive_failures,
            consecutive_successes: core.consecutive_successes,
            total_requests: self.totals.requests.load(Ordering::Relaxed),
            total_successes: self.totals.successes.load(Ordering::Relaxed),
            total_failures: self.totals.failures.load(Ordering::Relaxed),
            total_rejections: self.totals.rejections.load(Ordering::Relaxed),
            last_failure: core.last_failure,
            last_success: core.last_success,
        }
    }
}
