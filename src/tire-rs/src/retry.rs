use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::transport::Transport;
use crate::{Method, Request, Response, Result, RetryConfig};

/// Decides whether a completed response counts as a successful attempt
pub type ResponsePredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Status 200 with a non-empty body.
///
/// Note that this also rejects a valid empty 200 reply.
pub fn success_with_body(response: &Response) -> bool {
    response.status == 200 && !response.body.is_empty()
}

/// Retries GET requests a fixed number of times with a fixed pause in between.
///
/// An attempt fails on a connection error, or when the predicate (if any)
/// rejects the response. After the last attempt its outcome is returned
/// as-is. Other verbs go straight to the inner transport.
pub struct RetryingTransport<T> {
    inner: T,
    attempts: usize,
    backoff: Duration,
    predicate: Option<ResponsePredicate>,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::from_config(inner, &RetryConfig::default())
    }

    pub fn from_config(inner: T, config: &RetryConfig) -> Self {
        Self {
            inner,
            attempts: config.attempts.max(1),
            backoff: config.backoff(),
            predicate: None,
        }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn get_with_retry(&self, request: Request) -> Result<Response> {
        let mut attempt = 1;
        loop {
            let result = self.inner.execute(request.clone()).await;

            let failure = match &result {
                Ok(response) => match &self.predicate {
                    Some(accept) if !accept(response) => {
                        Some(format!("response rejected (status {})", response.status))
                    }
                    _ => None,
                },
                Err(err) if err.is_transient() => Some(err.to_string()),
                Err(_) => None,
            };

            // success, or an error retrying cannot fix
            let Some(reason) = failure else {
                if attempt > 1 && result.is_ok() {
                    info!("GET {} succeeded after {} attempts", request.url, attempt);
                }
                return result;
            };

            if attempt >= self.attempts {
                warn!(
                    "GET {} failed (attempt {}/{}): {}. Giving up",
                    request.url, attempt, self.attempts, reason
                );
                return result;
            }

            warn!(
                "GET {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                request.url, attempt, self.attempts, reason, self.backoff
            );
            attempt += 1;
            sleep(self.backoff).await;
        }
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        if request.method == Method::Get {
            self.get_with_retry(request).await
        } else {
            self.inner.execute(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Plays back scripted outcomes, repeating the last one
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<Response>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<Response>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn duplicate(result: &Result<Response>) -> Result<Response> {
        match result {
            Ok(response) => Ok(response.clone()),
            Err(Error::Connection(msg)) => Err(Error::Connection(msg.clone())),
            Err(other) => Err(Error::InvalidRequest(other.to_string())),
        }
    }

    #[async_trait::async_trait]
    impl Transport for Scripted {
        async fn execute(&self, _request: Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                duplicate(outcomes.front().unwrap())
            }
        }
    }

    fn refused() -> Result<Response> {
        Err(Error::Connection("connection refused".to_string()))
    }

    fn retrying(outcomes: Vec<Result<Response>>) -> RetryingTransport<Arc<Scripted>> {
        RetryingTransport::new(Arc::new(Scripted::new(outcomes))).with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_connection_failures() {
        let transport = retrying(vec![refused(), refused(), Ok(Response::new(200, "{}"))]);

        let response = transport.get("http://localhost:9200/_status", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let transport = retrying(vec![refused()]);

        let result = transport.get("http://localhost:9200/_status", None).await;
        assert!(matches!(result, Err(Error::Connection(_))));
        assert_eq!(transport.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_predicate_rejection_counts_as_failure() {
        let transport = retrying(vec![
            Ok(Response::new(503, "")),
            Ok(Response::new(200, r#"{"hits":{}}"#)),
        ])
        .with_predicate(success_with_body);

        let response = transport.get("http://localhost:9200/a/_search", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_predicate_returns_last_response() {
        let transport = retrying(vec![Ok(Response::new(200, ""))]).with_predicate(success_with_body);

        let response = transport.get("http://localhost:9200/a/_search", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert_eq!(transport.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_without_predicate_error_status_is_success() {
        let transport = retrying(vec![Ok(Response::new(500, "boom"))]);

        let response = transport.get("http://localhost:9200/a/_search", None).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(transport.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_programmer_errors_are_not_retried() {
        let transport = retrying(vec![Err(Error::InvalidRequest("bad url".to_string()))]);

        let result = transport.get("not a url", None).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(transport.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_other_verbs_pass_through() {
        let transport = retrying(vec![refused()]);

        let result = transport
            .post("http://localhost:9200/articles/article", "{}".to_string())
            .await;
        assert!(result.is_err());
        assert_eq!(transport.inner().calls(), 1);
    }

    /// Always refuses, remembering when each attempt started
    struct Timed {
        attempts: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait::async_trait]
    impl Transport for Timed {
        async fn execute(&self, _request: Request) -> Result<Response> {
            self.attempts.lock().unwrap().push(tokio::time::Instant::now());
            refused()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_attempts() {
        let backoff = Duration::from_millis(100);
        let transport = RetryingTransport::new(Timed {
            attempts: Mutex::new(Vec::new()),
        })
        .with_backoff(backoff);

        let started = tokio::time::Instant::now();
        let result = transport.get("http://localhost:9200/_status", None).await;
        assert!(matches!(result, Err(Error::Connection(_))));

        let attempts = transport.inner().attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        // no pause before the first attempt
        assert_eq!(attempts[0], started);
        // the paused clock may round a timer up to the next millisecond tick
        let tick = Duration::from_millis(1);
        for gap in [attempts[1] - attempts[0], attempts[2] - attempts[1]] {
            assert!(gap >= backoff && gap <= backoff + tick, "gap was {:?}", gap);
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= backoff * 2 && elapsed <= backoff * 2 + tick * 2);
    }

    #[test]
    fn test_success_with_body() {
        assert!(success_with_body(&Response::new(200, "{}")));
        assert!(!success_with_body(&Response::new(200, "")));
        assert!(!success_with_body(&Response::new(201, "{}")));
    }
}
