use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use livetrans_core::{TranslateError, Translator};

/// Timeout, retry and circuit breaker settings for [`ReliableTranslator`].
#[derive(Clone, Debug)]
pub struct ReliableConfig {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for ReliableConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 0,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.2,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

/// Wraps a [`Translator`] with a per-attempt timeout, retries and a circuit breaker.
///
/// - Retryable errors (rate limits, 5xx, network) are retried with
///   exponential backoff and jitter, honoring `retry_after` hints.
/// - After `circuit_breaker_threshold` consecutive failed calls the breaker
///   opens and calls fail fast with [`TranslateError::Unavailable`] until the
///   cooldown elapses; the next call is then let through as a trial.
pub struct ReliableTranslator<T: Translator> {
    inner: T,
    config: ReliableConfig,
    circuit_state: RwLock<CircuitState>,
    consecutive_failures: AtomicU32,
    total_retries: AtomicU64,
}

impl<T: Translator> ReliableTranslator<T> {
    pub fn new(inner: T, config: ReliableConfig) -> Self {
        Self {
            inner,
            config,
            circuit_state: RwLock::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            total_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: T) -> Self {
        Self::new(inner, ReliableConfig::default())
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn check_circuit(&self) -> Result<(), TranslateError> {
        let state = *self.circuit_state.read();
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open { since } => {
                if since.elapsed() >= self.config.circuit_breaker_cooldown {
                    *self.circuit_state.write() = CircuitState::HalfOpen;
                    info!(translator = self.inner.name(), "circuit breaker half-open, probing");
                    Ok(())
                } else {
                    Err(TranslateError::Unavailable(format!(
                        "{} circuit open after {} consecutive failures",
                        self.inner.name(),
                        self.consecutive_failures.load(Ordering::Relaxed)
                    )))
                }
            }
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut state = self.circuit_state.write();
        if *state != CircuitState::Closed {
            info!(translator = self.inner.name(), "circuit breaker closed");
            *state = CircuitState::Closed;
        }
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.circuit_state.write();
        let trips = match *state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => failures >= self.config.circuit_breaker_threshold,
            CircuitState::Open { .. } => false,
        };
        if trips {
            warn!(
                translator = self.inner.name(),
                failures,
                cooldown_secs = self.config.circuit_breaker_cooldown.as_secs(),
                "circuit breaker opened"
            );
            *state = CircuitState::Open {
                since: Instant::now(),
            };
        }
    }

    fn retry_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }

        let exp_ms = self.config.base_delay.as_millis() as f64 * 2.0_f64.powi(attempt as i32);
        let capped = exp_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = capped * self.config.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::rng().random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    async fn attempt(&self, text: &str) -> Result<String, TranslateError> {
        match tokio::time::timeout(self.config.timeout, self.inner.translate(text)).await {
            Ok(result) => result,
            Err(_) => Err(TranslateError::Timeout(self.config.timeout)),
        }
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn circuit_state_name(&self) -> &'static str {
        match *self.circuit_state.read() {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[async_trait]
impl<T: Translator> Translator for ReliableTranslator<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.check_circuit()?;

        let mut attempt = 0;
        loop {
            match self.attempt(text).await {
                Ok(translation) => {
                    self.record_success();
                    return Ok(translation);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.retry_delay(attempt, e.suggested_delay());
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        translator = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying translation"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.indicates_outage() {
                        self.record_failure();
                    } else {
                        debug!(
                            translator = self.inner.name(),
                            error_kind = e.error_kind(),
                            "failure not counted toward circuit breaker"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
