use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::{Error, Method, Request, Response, Result, TransportConfig};

/// Performs one HTTP request per call against the engine.
///
/// Network failures come back as `Error::Connection`; any HTTP status,
/// including 4xx/5xx, comes back as a `Response`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;

    async fn get(&self, url: &str, body: Option<String>) -> Result<Response> {
        let mut request = Request::new(Method::Get, url);
        request.body = body;
        self.execute(request).await
    }

    async fn post(&self, url: &str, body: String) -> Result<Response> {
        self.execute(Request::new(Method::Post, url).with_body(body))
            .await
    }

    async fn put(&self, url: &str, body: String) -> Result<Response> {
        self.execute(Request::new(Method::Put, url).with_body(body))
            .await
    }

    async fn delete(&self, url: &str) -> Result<Response> {
        self.execute(Request::new(Method::Delete, url)).await
    }

    async fn head(&self, url: &str) -> Result<Response> {
        self.execute(Request::new(Method::Head, url)).await
    }
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_builder() {
        Error::InvalidRequest(err.to_string())
    } else {
        Error::Connection(err.to_string())
    }
}

/// Default transport: a single shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
    default_timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
            default_timeout: None,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let client = if config.insecure_skip_verify {
            reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?
        } else {
            reqwest::Client::new()
        };

        Ok(Self {
            client,
            default_timeout: Some(config.timeout()),
        })
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self {
            client,
            default_timeout: None,
        }
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        debug!("{}", request.to_curl());

        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);
        if let Some(timeout) = request.timeout.or(self.default_timeout) {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_reqwest_error)?;

        debug!(
            "{} {} -> {} ({} ms)",
            request.method,
            request.url,
            status,
            started.elapsed().as_millis()
        );

        Ok(Response::new(status, body).with_headers(headers))
    }
}
