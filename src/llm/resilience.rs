//! LLM resilience wrapper with retries and circuit breaking.
//!
//! Extraction and suggestion calls both fail soft further up the stack, so
//! this wrapper's job is to stop hammering a provider that is down: after
//! enough consecutive failures the breaker opens and calls fail immediately
//! until the reset timeout elapses.

use super::LlmProvider;
use crate::{Error, Result};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Resilience configuration for LLM calls.
#[derive(Debug, Clone)]
pub struct LlmResilienceConfig {
    /// Maximum number of retries for timeouts.
    pub max_retries: u32,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
    /// Maximum trial calls while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for LlmResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_backoff_ms: 250,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl LlmResilienceConfig {
    /// Loads resilience configuration from config file settings.
    #[must_use]
    pub fn from_config(config: &crate::config::LlmConfig) -> Self {
        let mut settings = Self::default();
        if let Some(max_retries) = config.max_retries {
            settings.max_retries = max_retries;
        }
        if let Some(retry_backoff_ms) = config.retry_backoff_ms {
            settings.retry_backoff_ms = retry_backoff_ms;
        }
        if let Some(threshold) = config.breaker_failure_threshold {
            settings.breaker_failure_threshold = threshold.max(1);
        }
        if let Some(reset_ms) = config.breaker_reset_ms {
            settings.breaker_reset_timeout_ms = reset_ms;
        }
        if let Some(half_open) = config.breaker_half_open_max_calls {
            settings.breaker_half_open_max_calls = half_open.max(1);
        }
        settings
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl CircuitBreaker {
    fn new(config: &LlmResilienceConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            half_open_max_calls: config.breaker_half_open_max_calls.max(1),
        }
    }

    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen { attempts: 1 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    /// Records a failure; returns true if this trip opened the circuit.
    fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen { .. } => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen { .. } => 2,
        }
    }
}

/// LLM provider wrapper with timeout retries, a circuit breaker and metrics.
pub struct ResilientLlmProvider<P: LlmProvider> {
    inner: P,
    config: LlmResilienceConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl<P: LlmProvider> ResilientLlmProvider<P> {
    /// Creates a new resilient LLM provider wrapper.
    #[must_use]
    pub fn new(inner: P, config: LlmResilienceConfig) -> Self {
        let breaker = CircuitBreaker::new(&config);
        Self {
            inner,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    fn execute<F>(&self, operation: &'static str, mut call: F) -> Result<String>
    where
        F: FnMut() -> Result<String>,
    {
        let provider = self.inner.name();
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            operation = operation,
            status = tracing::field::Empty,
        );
        let _enter = span.enter();

        let allowed = self
            .breaker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allow();
        if !allowed {
            span.record("status", "circuit_open");
            metrics::counter!(
                "llm_requests_total",
                "provider" => provider,
                "operation" => operation,
                "status" => "circuit_open"
            )
            .increment(1);
            return Err(Error::OperationFailed {
                operation: format!("llm_{operation}"),
                cause: "circuit breaker open".to_string(),
            });
        }

        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let start = Instant::now();
            let result = call();
            let elapsed = start.elapsed();

            match result {
                Ok(text) => {
                    Self::record_request(provider, operation, "success", elapsed);
                    self.update_breaker(provider, operation, true);
                    span.record("status", "success");
                    return Ok(text);
                },
                Err(err) => {
                    let timeout = is_timeout_error(&err);
                    let status = if timeout { "timeout" } else { "error" };
                    Self::record_request(provider, operation, status, elapsed);
                    span.record("status", status);

                    if timeout && attempt < max_attempts {
                        tracing::warn!(
                            attempt,
                            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            "Retrying LLM call after timeout"
                        );
                        metrics::counter!(
                            "llm_retries_total",
                            "provider" => provider,
                            "operation" => operation
                        )
                        .increment(1);
                        if self.config.retry_backoff_ms > 0 {
                            std::thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
                        }
                        continue;
                    }

                    self.update_breaker(provider, operation, false);
                    return Err(err);
                },
            }
        }
    }

    fn update_breaker(&self, provider: &'static str, operation: &'static str, success: bool) {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        let tripped = if success {
            breaker.on_success();
            false
        } else {
            breaker.on_failure()
        };
        let state = breaker.state_value();
        drop(breaker);

        metrics::gauge!("llm_circuit_breaker_state", "provider" => provider)
            .set(f64::from(state));
        if tripped {
            metrics::counter!(
                "llm_circuit_breaker_trips_total",
                "provider" => provider,
                "operation" => operation
            )
            .increment(1);
            tracing::warn!(provider, operation, "LLM circuit breaker opened");
        }
    }

    fn record_request(
        provider: &'static str,
        operation: &'static str,
        status: &'static str,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "llm_requests_total",
            "provider" => provider,
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "llm_request_duration_ms",
            "provider" => provider,
            "operation" => operation,
            "status" => status
        )
        .record(elapsed.as_secs_f64() * 1000.0);
    }
}

impl<P: LlmProvider> LlmProvider for ResilientLlmProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.execute("complete", || self.inner.complete(prompt))
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.execute("complete_with_system", || {
            self.inner.complete_with_system(system, user)
        })
    }
}

fn is_timeout_error(err: &Error) -> bool {
    match err {
        Error::OperationFailed { cause, .. } => {
            let lower = cause.to_lowercase();
            lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline")
        },
        _ => false,
    }
}
