//! Composed resilience wrapper around a single provider invocation.
//!
//! Policies apply in a fixed order:
//! 1. **Timeout** bounds every attempt.
//! 2. **Retry** repeats timed-out or transiently failed attempts.
//! 3. **Circuit breaker** is consulted before each attempt and records
//!    each attempt's outcome.
//!
//! Nested from the outside in this is `retry(breaker(timeout(call)))`.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize};

use crate::config::humantime_duration;
use crate::dispatcher::DispatchError;
use crate::providers::ProviderError;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Fixed delay between attempts
    #[serde(with = "humantime_duration")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Timeout, retry and circuit breaking for provider calls.
pub struct ResiliencePolicy {
    timeout: Duration,
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl ResiliencePolicy {
    pub fn new(timeout: Duration, retry: RetryConfig, breaker: CircuitBreakerConfig) -> Self {
        Self {
            timeout,
            retry,
            breaker: CircuitBreaker::new(breaker),
        }
    }

    /// Run `op` under all policies.
    ///
    /// `op` is called once per attempt and must build a fresh future each
    /// time. A timed-out attempt's future is dropped, which cancels it.
    pub async fn execute<T, F, Fut>(&self, provider_id: &str, mut op: F) -> Result<T, DispatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = AtomicU32::new(0);
        let backoff = ConstantBuilder::default()
            .with_delay(self.retry.delay)
            .with_max_times(self.retry.max_attempts.saturating_sub(1) as usize);

        let attempt = || {
            let call = op();
            let n = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move { self.attempt(provider_id, n, call).await }
        };

        attempt
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(DispatchError::is_retryable)
            .notify(|err: &DispatchError, delay: Duration| {
                tracing::info!(
                    provider_id,
                    attempt = attempts.load(Ordering::Relaxed),
                    max_attempts = self.retry.max_attempts,
                    delay = ?delay,
                    error = %err,
                    "Retrying provider call"
                );
            })
            .await
    }

    /// One guarded attempt: breaker check, then the timed call.
    async fn attempt<T, Fut>(&self, provider_id: &str, n: u32, call: Fut) -> Result<T, DispatchError>
    where
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let permit = match self.breaker.try_acquire(provider_id) {
            Ok(permit) => permit,
            Err(open) => {
                tracing::warn!(
                    provider_id,
                    attempt = n,
                    retry_in = ?open.retry_in,
                    "Circuit open, skipping provider call"
                );
                return Err(DispatchError::CircuitOpen {
                    provider_id: provider_id.to_string(),
                    retry_in: open.retry_in,
                });
            }
        };
        if permit.is_trial() {
            tracing::debug!(provider_id, attempt = n, "Admitted as half-open trial call");
        }

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => {
                permit.record_success();
                tracing::debug!(provider_id, attempt = n, "Provider call succeeded");
                Ok(value)
            }
            Ok(Err(e)) if e.is_transient() => {
                permit.record_failure();
                tracing::warn!(provider_id, attempt = n, error = %e, "Provider call failed");
                Err(DispatchError::ProviderTransient {
                    provider_id: provider_id.to_string(),
                    attempts: n,
                    source: e,
                })
            }
            Ok(Err(e)) => {
                // Counted by the breaker, never retried.
                permit.record_failure();
                tracing::warn!(
                    provider_id,
                    attempt = n,
                    error = %e,
                    "Provider call failed permanently"
                );
                Err(DispatchError::ProviderPermanent {
                    provider_id: provider_id.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                permit.record_failure();
                tracing::warn!(
                    provider_id,
                    attempt = n,
                    timeout = ?self.timeout,
                    "Provider call timed out"
                );
                Err(DispatchError::ProviderTransient {
                    provider_id: provider_id.to_string(),
                    attempts: n,
                    source: ProviderError::Timeout(self.timeout),
                })
            }
        }
    }

    /// Current circuit state for a provider.
    pub fn circuit_state(&self, provider_id: &str) -> CircuitState {
        self.breaker.state(provider_id)
    }

    /// Close every circuit.
    pub fn reset_circuits(&self) {
        self.breaker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn policy(max_attempts: u32) -> ResiliencePolicy {
        ResiliencePolicy::new(
            Duration::from_secs(30),
            RetryConfig {
                max_attempts,
                delay: Duration::from_millis(1000),
            },
            CircuitBreakerConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let policy = policy(3);
        let calls = AtomicUsize::new(0);

        let result = policy
            .execute("p", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_until_success() {
        let policy = policy(3);
        let calls = AtomicUsize::new(0);

        let result = policy
            .execute("p", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Unavailable("busy".into()))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let policy = policy(3);
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .execute("p", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::HttpError("connection reset".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(DispatchError::ProviderTransient { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("Expected ProviderTransient, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let policy = policy(3);
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .execute("p", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::InvalidConfiguration("missing model".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(DispatchError::ProviderPermanent { .. })));
        assert_eq!(
            policy.circuit_state("p"),
            CircuitState::Closed {
                failures: 1,
                requests: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_each_attempt() {
        let policy = policy(3);
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = policy
            .execute("p", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(DispatchError::ProviderTransient {
                source: ProviderError::Timeout(_),
                ..
            })
        ));
        // 3 x 30s timeouts plus 2 x 1s delays
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(92), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(93), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_config_disables_retry() {
        let policy = policy(1);
        let calls = AtomicUsize::new(0);

        let _: Result<(), _> = policy
            .execute("p", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Unavailable("down".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
