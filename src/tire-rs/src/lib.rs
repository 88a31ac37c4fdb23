//! Tire Client Library
//!
//! HTTP client for search engines speaking the Elasticsearch REST/JSON API.
//!
//! ```rust,no_run
//! use tire::{Client, SearchOptions};
//!
//! # async fn run() -> tire::Result<()> {
//! let client = Client::new("http://localhost:9200");
//! let results = client
//!     .search(["articles"], SearchOptions::page(1, 10), |s| {
//!         s.query(|q| {
//!             q.string("title:T*", None);
//!         })
//!         .filter("terms", serde_json::json!({ "tags": ["ruby"] }));
//!     })
//!     .await?;
//!
//! for item in &results {
//!     println!("{:?} {:?}", item.id, item.get("title"));
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod index;
mod model;
mod pool;
mod retry;
mod stats;
mod transport;

#[cfg(test)]
mod mock;

pub use client::Client;
pub use index::{Index, Stored};
pub use model::{model_mappings, Importable, ModelIndex, Searchable};
pub use pool::PooledTransport;
pub use retry::{success_with_body, ResponsePredicate, RetryingTransport};
pub use stats::{ClientStats, StatsSnapshot};
pub use transport::{HttpTransport, Transport};

pub use tire_core::{
    config, models, query, results, search, total_pages, Collection, Config, Error, Facet, Filter,
    Highlight, Indexable, Item, Method, Pagination, Property, Query, Record, Request, Response,
    Result, RetryConfig, Schema, SearchOptions, SearchRequest, Sort, SortDirection, SortEntry,
    TransportConfig, TransportKind,
};
