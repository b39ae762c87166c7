//! Circuit breaker for the graph backend.
//!
//! A single-mutex-guarded tri-state machine. CLOSED -> OPEN when consecutive
//! connection failures reach the threshold (or on initialization/health-check
//! failure, or on the deadlock threshold); OPEN rejects fast; after the timeout
//! elapses a single half-open probe decides CLOSED or back to OPEN.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use codeindex_domain::error::{Error, Result};

/// The three circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

struct Inner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    trips: u64,
}

/// Configuration for the breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: codeindex_domain::constants::DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            timeout: Duration::from_millis(
                codeindex_domain::constants::DEFAULT_CIRCUIT_BREAKER_TIMEOUT_MS,
            ),
        }
    }
}

/// The circuit breaker itself.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
                trips: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state, accounting for an elapsed OPEN timeout: transitions to
    /// HALF_OPEN as a side effect of observing it. The probe itself is
    /// executed by the caller via [`CircuitBreaker::before_call`].
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        if inner.state == CircuitState::Open {
            if let Some(last) = inner.last_failure {
                if last.elapsed() >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                }
            }
        }
        inner.state
    }

    /// Total number of CLOSED->OPEN trips over this breaker's lifetime.
    #[must_use]
    pub fn trip_count(&self) -> u64 {
        self.lock().trips
    }

    /// Call before attempting an operation. Fails fast with
    /// [`Error::CircuitOpen`] if the breaker is OPEN (and the timeout has not yet
    /// elapsed); allows exactly one caller through when HALF_OPEN by itself
    /// transitioning back to a private "probing" sub-state is not modeled here —
    /// callers are expected to serialize their own single probe, which the graph
    /// service's health-check/probe path does via its own `Mutex`.
    pub fn before_call(&self) -> Result<CircuitState> {
        let state = self.state();
        if state == CircuitState::Open {
            return Err(Error::CircuitOpen);
        }
        Ok(state)
    }

    /// Record a success: resets the failure count and, if currently
    /// CLOSED/HALF_OPEN, moves (or keeps) the breaker at CLOSED.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.failures = 0;
        inner.state = CircuitState::Closed;
    }

    /// Record a failure. Trips to OPEN once `failures >= threshold`.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        inner.last_failure = Some(Instant::now());
        if inner.failures >= self.config.threshold && inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            inner.trips += 1;
        } else if inner.state == CircuitState::HalfOpen {
            // A half-open probe failed: re-open immediately regardless of the
            // accumulated failure count.
            inner.state = CircuitState::Open;
            inner.trips += 1;
        }
    }

    /// Force the breaker OPEN unconditionally (initialization failure, health
    /// check failure, deadlock threshold reached).
    pub fn force_open(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            inner.trips += 1;
        }
        inner.state = CircuitState::Open;
        inner.last_failure = Some(Instant::now());
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.lock().failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 5,
            timeout: Duration::from_millis(50),
        });
        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trip_count(), 1);
        assert!(matches!(breaker.before_call(), Err(Error::CircuitOpen)));
    }

    #[test]
    fn request_after_reaching_threshold_fails_fast() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 3,
            timeout: Duration::from_secs(60),
        });
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(breaker.before_call().is_err());
    }

    #[test]
    fn half_open_after_timeout_then_closes_on_success() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 2,
            timeout: Duration::from_millis(10),
        });
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.before_call().is_ok());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 2,
            timeout: Duration::from_millis(10),
        });
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn force_open_trips_regardless_of_failure_count() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trip_count(), 1);
    }
}
