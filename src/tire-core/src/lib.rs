//! Tire Core Library
//!
//! This crate provides the engine-independent pieces of Tire:
//! - Request / response triple shared by all transports
//! - Query, filter, sort, facet and highlight DSL
//! - Search request rendering to the engine's JSON grammar
//! - Result collections with pagination
//! - Schema-declared records and model naming
//! - Configuration and error types

pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod query;
pub mod results;
pub mod search;

// Re-export commonly used types
pub use config::{Config, RetryConfig, TransportConfig, TransportKind};
pub use error::{Error, Result};
pub use http::{encode_segment, Method, Request, Response};
pub use models::{Indexable, Property, Record, Schema};
pub use query::{Facet, Filter, Highlight, Query, Sort, SortDirection, SortEntry};
pub use results::{total_pages, Collection, Item, Pagination};
pub use search::{SearchOptions, SearchRequest};
