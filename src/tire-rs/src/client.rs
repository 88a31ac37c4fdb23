use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::index::Index;
use crate::pool::PooledTransport;
use crate::retry::RetryingTransport;
use crate::stats::ClientStats;
use crate::transport::{HttpTransport, Transport};
use crate::{
    Collection, Config, Item, Request, Response, Result, SearchOptions, SearchRequest,
    TransportKind,
};

/// Entry point to the engine: owns the transport and the base URL
#[derive(Clone)]
pub struct Client {
    base_url: String,
    transport: Arc<dyn Transport>,
    per_page: u64,
    stats: Arc<ClientStats>,
}

impl Client {
    /// Create a new client connected to the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            per_page: crate::search::DEFAULT_PER_PAGE,
            stats: Arc::new(ClientStats::new()),
        }
    }

    /// Build the transport stack described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn Transport> = match (config.transport.kind, config.retry.enabled) {
            (TransportKind::Http, false) => Arc::new(HttpTransport::from_config(&config.transport)?),
            (TransportKind::Http, true) => Arc::new(RetryingTransport::from_config(
                HttpTransport::from_config(&config.transport)?,
                &config.retry,
            )),
            (TransportKind::Pooled, false) => {
                Arc::new(PooledTransport::from_config(&config.transport)?)
            }
            (TransportKind::Pooled, true) => Arc::new(RetryingTransport::from_config(
                PooledTransport::from_config(&config.transport)?,
                &config.retry,
            )),
        };

        debug!(
            "Client configured for {} (transport={:?}, retry={})",
            config.base_url(),
            config.transport.kind,
            config.retry.enabled
        );

        let mut client = Self::with_transport(config.base_url(), transport);
        client.per_page = config.per_page;
        Ok(client)
    }

    /// Share counters with other clients or the caller
    pub fn with_stats(mut self, stats: Arc<ClientStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &Arc<ClientStats> {
        &self.stats
    }

    pub fn index(&self, name: impl Into<String>) -> Index {
        Index::new(self.clone(), name)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request through the transport and record its outcome
    pub async fn send(&self, request: Request) -> Result<Response> {
        let outcome = self.transport.execute(request).await;
        self.stats.record(&outcome);
        outcome
    }

    fn request_for<I, S>(&self, indices: I, options: SearchOptions) -> SearchRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = options;
        if options.page.is_some() && options.per_page.is_none() && options.size.is_none() {
            options.per_page = Some(self.per_page);
        }
        SearchRequest::new(indices).with_options(options)
    }

    /// Search one or more indices, returning raw items
    pub async fn search<I, S, F>(
        &self,
        indices: I,
        options: SearchOptions,
        build: F,
    ) -> Result<Collection<Item>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut SearchRequest),
    {
        self.search_with(indices, options, build, Ok).await
    }

    /// Search and wrap every hit with `factory`
    pub async fn search_with<T, I, S, F, H>(
        &self,
        indices: I,
        options: SearchOptions,
        build: F,
        factory: H,
    ) -> Result<Collection<T>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut SearchRequest),
        H: FnMut(Item) -> Result<T>,
    {
        let mut request = self.request_for(indices, options);
        build(&mut request);
        self.perform(&request, factory).await
    }

    /// Run a prepared search request
    pub async fn perform<T, H>(&self, search: &SearchRequest, factory: H) -> Result<Collection<T>>
    where
        H: FnMut(Item) -> Result<T>,
    {
        let request = search.to_request(&self.base_url)?;
        let response = self.send(request).await?.error_for_status()?;

        let body: Value = response.json()?;
        let collection = Collection::from_value(&body, search.pagination(), factory)?;
        self.stats.record_search(collection.took());

        debug!(
            "Search on {} returned {} of {} hits in {} ms",
            search.indices().join(","),
            collection.len(),
            collection.total(),
            collection.took()
        );

        Ok(collection)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}
