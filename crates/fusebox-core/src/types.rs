//! Circuit breaker types and configuration

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, operations proceed normally
    Closed,
    /// Circuit is open, operations are rejected
    Open,
    /// Circuit is half-open, trial operations allowed to probe recovery
    HalfOpen,
}

/// Configuration for circuit breaker behavior
///
/// Fixed at construction; a breaker is never reconfigured in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in the closed state before opening the circuit
    pub failure_threshold: u32,
    /// Consecutive successes needed in half-open state to close
    pub success_threshold: u32,
    /// Time the circuit stays open before a trial call is permitted
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Duration,
    /// Interval between passive health checks
    #[serde(with = "humantime_serde")]
    pub monitoring_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(10),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a config for aggressive circuit breaking
    pub fn aggressive() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(15),
            monitoring_period: Duration::from_secs(5),
        }
    }

    /// Create a config for lenient circuit breaking
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 5,
            recovery_timeout: Duration::from_secs(120),
            monitoring_period: Duration::from_secs(30),
        }
    }

    /// Apply partial overrides on top of this config
    pub fn with_overrides(&self, overrides: &CircuitBreakerOverrides) -> Self {
        Self {
            failure_threshold: overrides.failure_threshold.unwrap_or(self.failure_threshold),
            success_threshold: overrides.success_threshold.unwrap_or(self.success_threshold),
            recovery_timeout: overrides.recovery_timeout.unwrap_or(self.recovery_timeout),
            monitoring_period: overrides.monitoring_period.unwrap_or(self.monitoring_period),
        }
    }
}

/// Partial configuration supplied by a caller
///
/// Unset fields fall back to the base config they are applied to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitBreakerOverrides {
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub success_threshold: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub recovery_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub monitoring_period: Option<Duration>,
}

/// Error from a guarded call
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open; the operation was never attempted
    #[error("circuit breaker open for provider: {provider}")]
    Open { provider: String },
    /// The wrapped operation failed; its error is carried unchanged
    #[error("operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    /// True for the synthetic open-circuit rejection
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Recover the wrapped operation error, if there is one
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Open { .. } => None,
            Self::OperationFailed(e) => Some(e),
        }
    }
}

/// Statistics for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Calls rejected while the circuit was open
    pub total_rejections: u64,
    pub last_failure: Option<Instant>,
    pub last_success: Option<Instant>,
}

impl CircuitBreakerStats {
    /// Fraction of requests that ended in failure, 0.0 with no traffic
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}
