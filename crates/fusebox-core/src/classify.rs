//! Failure classification for provider errors
//!
//! Classifies error messages into recovery classes so callers can decide
//! whether a failed request is worth retrying later. Classification is
//! advisory: the breaker counts every operation failure against the circuit
//! regardless of class.

use crate::types::CircuitBreakerError;

/// Error classification for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient errors that may succeed on retry
    Transient,
    /// Permanent errors that will not succeed on retry
    Permanent,
    /// Unknown errors - attempt limited retries
    Unknown,
}

impl ErrorClass {
    /// Check if an error of this class is worth retrying
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Unknown)
    }
}

/// Classify a provider error message
pub fn classify_message(message: &str) -> ErrorClass {
    let msg = message.to_lowercase();

    if msg.contains("timeout")
        || msg.contains("connection refused")
        || msg.contains("connection reset")
        || msg.contains("429")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
        || msg.contains("rate limit")
        || msg.contains("overloaded")
    {
        ErrorClass::Transient
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("404")
        || msg.contains("invalid")
        || msg.contains("context length")
    {
        ErrorClass::Permanent
    } else {
        ErrorClass::Unknown
    }
}

impl<E: std::fmt::Display> CircuitBreakerError<E> {
    /// Recovery class of this error
    ///
    /// An open-circuit rejection is always transient: the provider is
    /// presumed unavailable and the call can be retried after the recovery
    /// timeout. Wrapped operation errors are classified by message.
    pub fn class(&self) -> ErrorClass {
        match self {
            CircuitBreakerError::Open { .. } => ErrorClass::Transient,
            CircuitBreakerError::OperationFailed(e) => classify_message(&e.to_string()),
        }
    }
}
