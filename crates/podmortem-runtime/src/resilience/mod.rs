//! Resilience patterns for podmortem-runtime.
//!
//! This module provides:
//! - Per-attempt timeout
//! - Fixed-delay retry for transient failures
//! - Per-provider circuit breaker to prevent cascade failures

mod circuit_breaker;
mod policy;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitOpen, CircuitState, Permit,
};
pub use policy::{ResiliencePolicy, RetryConfig};
