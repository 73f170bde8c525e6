//! Circuit breaker registry for managing per-provider breakers

use std::collections::HashMap;
use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::types::{CircuitBreakerConfig, CircuitBreakerOverrides, CircuitBreakerStats};

/// Collection of circuit breakers, one per provider
///
/// Owned by the host application for the process lifetime: construct it at
/// startup and call [`destroy`](Self::destroy) from the shutdown path so the
/// monitoring tasks are cancelled and the process can exit cleanly.
pub struct CircuitBreakerRegistry {
    breakers: dashmap::DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    /// Create a new registry with default config
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a registry with a custom default config
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: dashmap::DashMap::new(),
            default_config: config,
        }
    }

    /// Get or create the circuit breaker for a provider
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_with_config(name, self.default_config.clone())
    }

    /// Get or create with an explicit config
    ///
    /// The configuration is fixed at first creation: a later call for an
    /// existing provider returns the existing breaker and ignores the
    /// supplied config. The entry API also guarantees that concurrent first
    /// access for the same name creates exactly one breaker.
    pub fn get_with_config(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::with_config(name, config)))
            .clone()
    }

    /// Get or create with partial overrides applied to the registry default
    pub fn get_with_overrides(
        &self,
        name: &str,
        overrides: &CircuitBreakerOverrides,
    ) -> Arc<CircuitBreaker> {
        self.get_with_config(name, self.default_config.with_overrides(overrides))
    }

    /// Get all registered provider names
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Get a stats snapshot for every registered breaker
    pub fn all_stats(&self) -> HashMap<String, CircuitBreakerStats> {
        self.breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().stats()))
            .collect()
    }

    /// Reset all circuit breakers
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// Cancel all monitoring tasks and clear the registry
    ///
    /// Intended for the host process shutdown sequence; safe to call more
    /// than once.
    pub fn destroy(&self) {
        for entry in self.breakers.iter() {
            entry.value().destroy();
        }
        self.breakers.clear();
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
