//! Fusebox Core Library
//!
//! This crate provides the failure isolation core for the Fusebox LLM
//! gateway: one circuit breaker per provider, a registry that manages the
//! fleet, and a passive per-breaker health monitor.
//!
//! A breaker makes local, in-memory accept/reject decisions for a single
//! process. It never retries, never imposes timeouts, and never rewrites the
//! outcome of the call it guards.

pub mod breaker;
pub mod classify;
mod monitor;
pub mod registry;
pub mod types;


// Re-export commonly used types
pub use breaker::CircuitBreaker;
pub use classify::{ErrorClass, classify_message};
pub use registry::CircuitBreakerRegistry;
pub use types::{
    CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerOverrides, CircuitBreakerStats,
    CircuitState,
};
