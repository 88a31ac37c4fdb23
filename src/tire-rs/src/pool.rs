//! Fixed-size pool of connection handles.
//!
//! Each call checks out one handle and gives it back when the guard drops,
//! whatever the outcome of the request. A connection fault on the borrowed
//! handle is retried exactly once on a freshly checked-out handle.

use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::transport::{HttpTransport, Transport};
use crate::{Error, Request, Response, Result, TransportConfig};

struct PoolInner<T> {
    idle: Mutex<Vec<T>>,
    semaphore: Arc<Semaphore>,
}

pub struct PooledTransport<T> {
    inner: Arc<PoolInner<T>>,
    size: usize,
    checkout_timeout: Duration,
}

/// A borrowed handle; returns itself to the pool on drop
struct PooledConnection<T> {
    conn: Option<T>,
    inner: Arc<PoolInner<T>>,
    _permit: OwnedSemaphorePermit,
}

impl<T> Deref for PooledConnection<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // only `None` while dropping
        self.conn.as_ref().expect("pooled connection already returned")
    }
}

impl<T> Drop for PooledConnection<T> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(conn);
        }
    }
}

impl<T: Transport + 'static> PooledTransport<T> {
    pub fn new(connections: Vec<T>, checkout_timeout: Duration) -> Result<Self> {
        if connections.is_empty() {
            return Err(Error::Configuration(
                "connection pool needs at least one connection".to_string(),
            ));
        }

        let size = connections.len();
        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections),
                semaphore: Arc::new(Semaphore::new(size)),
            }),
            size,
            checkout_timeout,
        })
    }

    pub fn with_factory<F>(size: usize, checkout_timeout: Duration, mut factory: F) -> Result<Self>
    where
        F: FnMut() -> Result<T>,
    {
        let connections = (0..size).map(|_| factory()).collect::<Result<Vec<_>>>()?;
        Self::new(connections, checkout_timeout)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Handles not currently checked out
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    async fn checkout(&self) -> Result<PooledConnection<T>> {
        let permit = tokio::time::timeout(
            self.checkout_timeout,
            self.inner.semaphore.clone().acquire_owned(),
        )
        .await
        .map_err(|_| Error::PoolTimeout(self.checkout_timeout))?
        .map_err(|_| Error::Configuration("connection pool is closed".to_string()))?;

        let conn = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or_else(|| Error::Configuration("connection pool is empty".to_string()))?;

        Ok(PooledConnection {
            conn: Some(conn),
            inner: self.inner.clone(),
            _permit: permit,
        })
    }
}

impl PooledTransport<HttpTransport> {
    /// `pool_size` independent reqwest clients
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        Self::with_factory(config.pool_size, config.checkout_timeout(), || {
            HttpTransport::from_config(config)
        })
    }
}

#[async_trait::async_trait]
impl<T: Transport + 'static> Transport for PooledTransport<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        let first = {
            let conn = self.checkout().await?;
            conn.execute(request.clone()).await
        };

        match first {
            Err(err) if err.is_transient() => {
                warn!(
                    "Pooled connection failed for {} {}: {}. Retrying on another connection",
                    request.method, request.url, err
                );
                let conn = self.checkout().await?;
                conn.execute(request).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with a connection error while the shared budget lasts
    struct FlakyConnection {
        failures_left: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
        status: u16,
    }

    #[async_trait::async_trait]
    impl Transport for FlakyConnection {
        async fn execute(&self, _request: Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                Err(Error::Connection("connection reset by peer".to_string()))
            } else {
                Ok(Response::new(self.status, "{}"))
            }
        }
    }

    fn flaky_pool(size: usize, failures: usize, status: u16) -> (PooledTransport<FlakyConnection>, Arc<AtomicUsize>) {
        let failures_left = Arc::new(AtomicUsize::new(failures));
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = PooledTransport::with_factory(size, Duration::from_millis(50), || {
            Ok(FlakyConnection {
                failures_left: failures_left.clone(),
                calls: calls.clone(),
                status,
            })
        })
        .unwrap();
        (pool, calls)
    }

    fn request() -> Request {
        Request::new(Method::Get, "http://localhost:9200/articles/_search")
    }

    #[tokio::test]
    async fn test_single_fault_is_retried_transparently() {
        let (pool, calls) = flaky_pool(2, 1, 200);

        let response = pool.execute(request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_repeated_fault_propagates() {
        let (pool, calls) = flaky_pool(2, 5, 200);

        let result = pool.execute(request()).await;
        assert!(matches!(result, Err(Error::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_single_handle_pool_retries_on_same_handle() {
        let (pool, calls) = flaky_pool(1, 1, 200);

        assert!(pool.execute(request()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_engine_error_is_not_retried() {
        let (pool, calls) = flaky_pool(2, 0, 500);

        let response = pool.execute(request()).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let (pool, _calls) = flaky_pool(1, 0, 200);

        let held = pool.checkout().await.unwrap();
        assert_eq!(pool.available(), 0);

        let result = pool.execute(request()).await;
        assert!(matches!(result, Err(Error::PoolTimeout(_))));

        drop(held);
        assert_eq!(pool.available(), 1);
        assert!(pool.execute(request()).await.is_ok());
    }

    struct SlowConnection {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Transport for SlowConnection {
        async fn execute(&self, _request: Request) -> Result<Response> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Response::new(200, "{}"))
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_pool_size() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(
            PooledTransport::with_factory(2, Duration::from_secs(5), || {
                Ok(SlowConnection {
                    active: active.clone(),
                    peak: peak.clone(),
                })
            })
            .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.execute(request()).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let result = PooledTransport::<FlakyConnection>::new(Vec::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
