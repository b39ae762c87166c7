//! Health monitor.
//!
//! Runs a trivial query on a fixed interval to confirm the backend is still
//! reachable. A failing check (including a hard timeout) marks the connection
//! unhealthy and force-trips the circuit breaker so subsequent callers fail
//! fast instead of blocking on a dead backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codeindex_domain::constants::{DEFAULT_HEALTH_CHECK_INTERVAL_MS, HEALTH_CHECK_TIMEOUT_MS};
use codeindex_domain::error::Result;
use codeindex_domain::ports::GraphDriver;
use tracing::warn;

use super::circuit_breaker::CircuitBreaker;

/// Health monitor tunables.
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_HEALTH_CHECK_INTERVAL_MS),
            timeout: Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS),
        }
    }
}

/// Tracks the last observed health state and drives the periodic check.
pub struct HealthMonitor {
    driver: Arc<dyn GraphDriver>,
    breaker: Arc<CircuitBreaker>,
    config: HealthMonitorConfig,
    healthy: AtomicBool,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>, breaker: Arc<CircuitBreaker>, config: HealthMonitorConfig) -> Self {
        Self {
            driver,
            breaker,
            config,
            healthy: AtomicBool::new(true),
        }
    }

    /// Whether the last health check (or the initial optimistic default)
    /// succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Run one health check immediately, updating the stored state and
    /// tripping the breaker on failure.
    pub async fn check_once(&self) -> Result<()> {
        let result = tokio::time::timeout(self.config.timeout, self.driver.verify_connectivity()).await;
        match result {
            Ok(Ok(())) => {
                self.healthy.store(true, Ordering::SeqCst);
                Ok(())
            }
            Ok(Err(e)) => {
                self.healthy.store(false, Ordering::SeqCst);
                self.breaker.force_open();
                warn!(error = %e, "graph health check failed");
                Err(e)
            }
            Err(_) => {
                self.healthy.store(false, Ordering::SeqCst);
                self.breaker.force_open();
                let err = codeindex_domain::error::Error::Timeout {
                    operation: "health_check".to_owned(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                };
                warn!(error = %err, "graph health check timed out");
                Err(err)
            }
        }
    }

    /// Spawn the background periodic check loop. The returned handle should be
    /// aborted on shutdown.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor.config.interval);
            loop {
                interval.tick().await;
                let _ = monitor.check_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::circuit_breaker::CircuitBreakerConfig;
    use async_trait::async_trait;
    use codeindex_domain::error::Error;
    use codeindex_domain::ports::{AccessMode, GraphSession};
    use std::sync::atomic::AtomicU32;

    struct FlakyDriver {
        fail_next: AtomicBool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GraphDriver for FlakyDriver {
        async fn session(&self, _mode: AccessMode) -> Result<Box<dyn GraphSession>> {
            unimplemented!()
        }
        async fn verify_connectivity(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.load(Ordering::SeqCst) {
                Err(Error::connection("down"))
            } else {
                Ok(())
            }
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_check_marks_connected() {
        let driver = Arc::new(FlakyDriver {
            fail_next: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
        let monitor = HealthMonitor::new(driver, breaker, HealthMonitorConfig::default());
        monitor.check_once().await.unwrap();
        assert!(monitor.is_connected());
    }

    #[tokio::test]
    async fn failing_check_marks_disconnected_and_trips_breaker() {
        let driver = Arc::new(FlakyDriver {
            fail_next: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
        let monitor = HealthMonitor::new(driver, Arc::clone(&breaker), HealthMonitorConfig::default());
        assert!(monitor.check_once().await.is_err());
        assert!(!monitor.is_connected());
        assert_eq!(breaker.state(), crate::graph::circuit_breaker::CircuitState::Open);
    }
}
