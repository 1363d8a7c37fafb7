//! Circuit breaker to prevent cascade failures.
//!
//! When a provider fails repeatedly, its circuit opens and subsequent
//! attempts fail immediately without invoking the provider.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::humantime_duration;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Size of the rolling window of attempt outcomes
    pub request_volume_threshold: u32,

    /// Failure ratio over a full window that opens the circuit
    pub failure_ratio: f64,

    /// Consecutive half-open successes needed to close the circuit
    pub success_threshold: u32,

    /// Time an open circuit waits before admitting trial calls
    #[serde(with = "humantime_duration")]
    pub delay: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            request_volume_threshold: 10,
            failure_ratio: 0.5,
            success_threshold: 3,
            delay: Duration::from_millis(5000),
        }
    }
}

/// Snapshot of a circuit, as reported to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    /// Normal operation
    Closed { failures: u32, requests: u32 },

    /// Circuit is open, all calls fail fast
    Open { opened_at: Instant },

    /// Testing if circuit can close
    HalfOpen { successes: u32 },
}

/// Rejection returned while a circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen {
    /// Time left before trial calls are admitted
    pub retry_in: Duration,
}

#[derive(Debug)]
enum Circuit {
    /// `true` marks a failed attempt
    Closed { window: VecDeque<bool> },
    Open { opened_at: Instant },
    /// At most one trial call is in flight at a time
    HalfOpen { successes: u32, trial_in_flight: bool },
}

impl Circuit {
    fn closed() -> Self {
        Circuit::Closed {
            window: VecDeque::new(),
        }
    }

    fn snapshot(&self) -> CircuitState {
        match self {
            Circuit::Closed { window } => CircuitState::Closed {
                failures: window.iter().filter(|failed| **failed).count() as u32,
                requests: window.len() as u32,
            },
            Circuit::Open { opened_at } => CircuitState::Open {
                opened_at: *opened_at,
            },
            Circuit::HalfOpen { successes, .. } => CircuitState::HalfOpen {
                successes: *successes,
            },
        }
    }
}

/// Admission to call a provider, returned by [`CircuitBreaker::try_acquire`].
///
/// Report the attempt's outcome with [`Permit::record_success`] or
/// [`Permit::record_failure`]. A half-open trial permit dropped without an
/// outcome (for example when the caller abandons the request) frees the
/// trial slot so the next call can try the provider.
#[must_use = "report the attempt outcome through the permit"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    provider_id: &'a str,
    trial: bool,
    settled: bool,
}

impl Permit<'_> {
    /// Whether this permit is the half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.record(self.provider_id, false, self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.record(self.provider_id, true, self.trial);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.release_trial(self.provider_id);
        }
    }
}

impl std::fmt::Debug for Permit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("provider_id", &self.provider_id)
            .field("trial", &self.trial)
            .finish()
    }
}

/// Circuit breaker prevents cascade failures.
///
/// Each provider id has its own circuit so one failing backend never
/// sheds load from another. State is shared by every request that
/// targets the same provider id.
pub struct CircuitBreaker {
    states: RwLock<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Ask permission to invoke a provider.
    ///
    /// An open circuit whose delay has elapsed moves to half-open and
    /// admits the call as the trial. While that trial is in flight every
    /// other call is rejected.
    pub fn try_acquire<'a>(&'a self, provider_id: &'a str) -> Result<Permit<'a>, CircuitOpen> {
        let permit = |trial| Permit {
            breaker: self,
            provider_id,
            trial,
            settled: false,
        };

        let mut states = self.states.write();
        let Some(circuit) = states.get_mut(provider_id) else {
            return Ok(permit(false));
        };

        match circuit {
            Circuit::Closed { .. } => Ok(permit(false)),
            Circuit::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed < self.config.delay {
                    return Err(CircuitOpen {
                        retry_in: self.config.delay - elapsed,
                    });
                }
                *circuit = Circuit::HalfOpen {
                    successes: 0,
                    trial_in_flight: true,
                };
                tracing::info!(provider_id, "Circuit transitioning to half-open for recovery test");
                Ok(permit(true))
            }
            Circuit::HalfOpen {
                trial_in_flight, ..
            } => {
                if *trial_in_flight {
                    Err(CircuitOpen {
                        retry_in: Duration::ZERO,
                    })
                } else {
                    *trial_in_flight = true;
                    Ok(permit(true))
                }
            }
        }
    }

    /// Check if the circuit for a provider currently rejects calls.
    pub fn is_open(&self, provider_id: &str) -> bool {
        self.try_acquire(provider_id).is_err()
    }

    /// Record a successful attempt.
    pub fn record_success(&self, provider_id: &str) {
        self.record(provider_id, false, true);
    }

    /// Record a failed attempt.
    pub fn record_failure(&self, provider_id: &str) {
        self.record(provider_id, true, true);
    }

    fn record(&self, provider_id: &str, failed: bool, trial: bool) {
        let mut states = self.states.write();
        let circuit = states
            .entry(provider_id.to_string())
            .or_insert_with(Circuit::closed);

        match circuit {
            Circuit::Closed { window } => {
                self.push_outcome(window, failed);
                if !failed {
                    return;
                }

                let requests = window.len();
                let failures = window.iter().filter(|failed| **failed).count();
                let ratio = failures as f64 / requests as f64;

                if requests >= self.config.request_volume_threshold as usize
                    && ratio >= self.config.failure_ratio
                {
                    *circuit = Circuit::Open {
                        opened_at: Instant::now(),
                    };
                    tracing::warn!(
                        provider_id,
                        failures,
                        requests,
                        "Circuit opened after repeated failures"
                    );
                }
            }
            // Late results from calls admitted before the circuit opened
            // do not count towards recovery.
            Circuit::HalfOpen { .. } if !trial => {}
            Circuit::HalfOpen { .. } if failed => {
                *circuit = Circuit::Open {
                    opened_at: Instant::now(),
                };
                tracing::warn!(provider_id, "Circuit reopened after failed recovery attempt");
            }
            Circuit::HalfOpen {
                successes,
                trial_in_flight,
            } => {
                if *successes + 1 >= self.config.success_threshold {
                    *circuit = Circuit::closed();
                    tracing::info!(provider_id, "Circuit closed after successful recovery");
                } else {
                    *successes += 1;
                    *trial_in_flight = false;
                }
            }
            Circuit::Open { .. } => {}
        }
    }

    fn push_outcome(&self, window: &mut VecDeque<bool>, failed: bool) {
        window.push_back(failed);
        while window.len() > self.config.request_volume_threshold as usize {
            window.pop_front();
        }
    }

    fn release_trial(&self, provider_id: &str) {
        if let Some(Circuit::HalfOpen {
            trial_in_flight, ..
        }) = self.states.write().get_mut(provider_id)
        {
            *trial_in_flight = false;
        }
    }

    /// Get current state of a circuit.
    pub fn state(&self, provider_id: &str) -> CircuitState {
        self.states
            .read()
            .get(provider_id)
            .map(Circuit::snapshot)
            .unwrap_or(CircuitState::Closed {
                failures: 0,
                requests: 0,
            })
    }

    /// Reset all circuits to closed.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
