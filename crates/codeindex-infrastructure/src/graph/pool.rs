//! Session pool.
//!
//! Read sessions are pooled and reused; write sessions are never pooled (the
//! backend's write-session contract does not allow sharing a session across
//! concurrent writers). Pool size, acquisition timeout, and connection lifetime
//! are all clamped to their documented bounds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use codeindex_domain::constants::{
    DEFAULT_ACQUISITION_TIMEOUT_MS, DEFAULT_CONNECTION_LIFETIME_MS, DEFAULT_POOL_SIZE,
    MAX_ACQUISITION_TIMEOUT_MS, MAX_CONNECTION_LIFETIME_MS, MAX_POOL_SIZE,
    MIN_ACQUISITION_TIMEOUT_MS, MIN_CONNECTION_LIFETIME_MS, MIN_POOL_SIZE,
};
use codeindex_domain::error::{Error, Result};
use codeindex_domain::ports::{AccessMode, GraphDriver, GraphSession};
use tokio::sync::{Mutex, Semaphore};

fn clamp(value: u64, min: u64, max: u64) -> u64 {
    value.clamp(min, max)
}

/// Pool tunables, clamped at construction time.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_pool_size: u32,
    pub acquisition_timeout: Duration,
    pub connection_lifetime: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn new(max_pool_size: u32, acquisition_timeout_ms: u64, connection_lifetime_ms: u64) -> Self {
        Self {
            max_pool_size: max_pool_size.clamp(MIN_POOL_SIZE, MAX_POOL_SIZE).max(MIN_POOL_SIZE),
            acquisition_timeout: Duration::from_millis(clamp(
                acquisition_timeout_ms,
                MIN_ACQUISITION_TIMEOUT_MS,
                MAX_ACQUISITION_TIMEOUT_MS,
            )),
            connection_lifetime: Duration::from_millis(clamp(
                connection_lifetime_ms,
                MIN_CONNECTION_LIFETIME_MS,
                MAX_CONNECTION_LIFETIME_MS,
            )),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_POOL_SIZE,
            DEFAULT_ACQUISITION_TIMEOUT_MS,
            DEFAULT_CONNECTION_LIFETIME_MS,
        )
    }
}

struct PooledSession {
    session: Box<dyn GraphSession>,
    created_at: Instant,
}

/// Point-in-time pool counters, exposed for health/metrics reporting.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolMetrics {
    pub created: u64,
    pub closed: u64,
    pub acquisitions: u64,
    pub acquisition_failures: u64,
}

/// A leased read session. On drop without an explicit [`PooledReadSession::release`]
/// call the session is discarded rather than silently returned, matching the
/// pool's explicit release contract.
pub struct PooledReadSession {
    session: Option<PooledSession>,
    pool: Arc<SessionPoolInner>,
}

impl PooledReadSession {
    /// Run a read query against the leased session.
    pub async fn run(
        &mut self,
        query: &str,
        params: codeindex_domain::ports::Params,
    ) -> Result<Vec<codeindex_domain::ports::GraphRecord>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::external("pool", "session already released"))?;
        session.session.run(query, params).await
    }

    /// Return the session to the pool (or close it if the pool is at the
    /// half-size release threshold and already has enough idle sessions, or
    /// the session has exceeded its connection lifetime).
    pub async fn release(mut self) {
        if let Some(pooled) = self.session.take() {
            self.pool.release(pooled).await;
        }
    }
}

impl Drop for PooledReadSession {
    fn drop(&mut self) {
        if let Some(pooled) = self.session.take() {
            let pool = Arc::clone(&self.pool);
            tokio::spawn(async move {
                pool.release(pooled).await;
            });
        }
    }
}

struct SessionPoolInner {
    driver: Arc<dyn GraphDriver>,
    config: PoolConfig,
    idle: Mutex<Vec<PooledSession>>,
    semaphore: Semaphore,
    metrics_created: AtomicU64,
    metrics_closed: AtomicU64,
    metrics_acquisitions: AtomicU64,
    metrics_acquisition_failures: AtomicU64,
}

impl SessionPoolInner {
    async fn release(&self, pooled: PooledSession) {
        let half = (self.config.max_pool_size as usize / 2).max(1);
        let mut idle = self.idle.lock().await;
        let expired = pooled.created_at.elapsed() >= self.config.connection_lifetime;
        if expired || idle.len() >= half {
            drop(idle);
            pooled.session.close().await.ok();
            self.metrics_closed.fetch_add(1, Ordering::SeqCst);
        } else {
            idle.push(pooled);
        }
    }
}

/// The session pool.
pub struct SessionPool {
    inner: Arc<SessionPoolInner>,
}

impl SessionPool {
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>, config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(SessionPoolInner {
                driver,
                semaphore: Semaphore::new(config.max_pool_size as usize),
                config,
                idle: Mutex::new(Vec::new()),
                metrics_created: AtomicU64::new(0),
                metrics_closed: AtomicU64::new(0),
                metrics_acquisitions: AtomicU64::new(0),
                metrics_acquisition_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Acquire a pooled read session, creating one lazily if none are idle.
    /// Bounded by `acquisition_timeout`.
    pub async fn acquire_read(&self) -> Result<PooledReadSession> {
        self.inner
            .metrics_acquisitions
            .fetch_add(1, Ordering::SeqCst);
        let permit = tokio::time::timeout(
            self.inner.config.acquisition_timeout,
            self.inner.semaphore.acquire(),
        )
        .await
        .map_err(|_| {
            self.inner
                .metrics_acquisition_failures
                .fetch_add(1, Ordering::SeqCst);
            Error::Timeout {
                operation: "acquire_read_session".to_owned(),
                timeout_ms: self.inner.config.acquisition_timeout.as_millis() as u64,
            }
        })?
        .map_err(|_| Error::external("pool", "semaphore closed"))?;
        permit.forget();

        let mut idle = self.inner.idle.lock().await;
        let pooled = if let Some(existing) = idle.pop() {
            existing
        } else {
            drop(idle);
            let session = self.inner.driver.session(AccessMode::Read).await?;
            self.inner.metrics_created.fetch_add(1, Ordering::SeqCst);
            PooledSession {
                session,
                created_at: Instant::now(),
            }
        };

        Ok(PooledReadSession {
            session: Some(pooled),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Acquire a write session. Write sessions are never pooled: a fresh
    /// session is opened and handed to the caller directly, and closing it is
    /// the caller's responsibility.
    pub async fn acquire_write(&self) -> Result<Box<dyn GraphSession>> {
        self.inner.driver.session(AccessMode::Write).await
    }

    /// Current point-in-time metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            created: self.inner.metrics_created.load(Ordering::SeqCst),
            closed: self.inner.metrics_closed.load(Ordering::SeqCst),
            acquisitions: self.inner.metrics_acquisitions.load(Ordering::SeqCst),
            acquisition_failures: self.inner.metrics_acquisition_failures.load(Ordering::SeqCst),
        }
    }

    /// Close every idle session. Active leased sessions close themselves on
    /// release/drop.
    pub async fn close_all(&self) {
        let mut idle = self.inner.idle.lock().await;
        for pooled in idle.drain(..) {
            pooled.session.close().await.ok();
            self.inner.metrics_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_clamps_out_of_range_values() {
        let config = PoolConfig::new(1000, 1, u64::MAX);
        assert_eq!(config.max_pool_size, MAX_POOL_SIZE);
        assert_eq!(
            config.acquisition_timeout,
            Duration::from_millis(MIN_ACQUISITION_TIMEOUT_MS)
        );
        assert_eq!(
            config.connection_lifetime,
            Duration::from_millis(MAX_CONNECTION_LIFETIME_MS)
        );
    }

    #[test]
    fn pool_config_default_is_within_bounds() {
        let config = PoolConfig::default();
        assert!(config.max_pool_size >= MIN_POOL_SIZE && config.max_pool_size <= MAX_POOL_SIZE);
    }
}
