use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::http::{encode_segment, Method, Request};
use crate::query::{Facet, Filter, Highlight, Query, Sort};
use crate::results::Pagination;

pub const DEFAULT_PER_PAGE: u64 = 10;

/// Request-time options accepted next to the DSL closure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl SearchOptions {
    pub fn page(page: u64, per_page: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            ..Default::default()
        }
    }
}

/// Everything needed to run one search against one or more indices
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    indices: Vec<String>,
    types: Vec<String>,
    query: Query,
    filters: Vec<Filter>,
    sort: Sort,
    facets: Vec<Facet>,
    highlight: Highlight,
    fields: Vec<String>,
    version: bool,
    page: Option<u64>,
    per_page: Option<u64>,
    from: Option<u64>,
    size: Option<u64>,
}

impl SearchRequest {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: indices.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.page = options.page;
        self.per_page = options.per_page;
        self.from = options.from;
        self.size = options.size;
        self.types = options.types;
        self
    }

    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    pub fn types<I, S>(&mut self, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn query<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut Query),
    {
        build(&mut self.query);
        self
    }

    pub fn filter(&mut self, filter_type: &str, options: Value) -> &mut Self {
        self.filters.push(Filter::new(filter_type, options));
        self
    }

    pub fn filter_args(&mut self, filter_type: &str, args: Vec<Value>) -> &mut Self {
        self.filters.push(Filter::from_args(filter_type, args));
        self
    }

    pub fn sort<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut Sort),
    {
        build(&mut self.sort);
        self
    }

    pub fn facet<F>(&mut self, name: &str, options: Value, build: F) -> &mut Self
    where
        F: FnOnce(&mut Facet),
    {
        let mut facet = Facet::new(name, options);
        build(&mut facet);
        self.facets.push(facet);
        self
    }

    pub fn highlight<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut Highlight),
    {
        build(&mut self.highlight);
        self
    }

    pub fn fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn version(&mut self, enabled: bool) -> &mut Self {
        self.version = enabled;
        self
    }

    pub fn page(&mut self, page: u64) -> &mut Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(&mut self, per_page: u64) -> &mut Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn from(&mut self, from: u64) -> &mut Self {
        self.from = Some(from);
        self
    }

    pub fn size(&mut self, size: u64) -> &mut Self {
        self.size = Some(size);
        self
    }

    fn effective_size(&self) -> Option<u64> {
        match (self.size, self.per_page, self.page) {
            (Some(size), _, _) => Some(size),
            (None, Some(per_page), _) => Some(per_page),
            (None, None, Some(_)) => Some(DEFAULT_PER_PAGE),
            (None, None, None) => None,
        }
    }

    fn effective_from(&self) -> Option<u64> {
        if let Some(from) = self.from {
            return Some(from);
        }
        let page = self.page?;
        let per_page = self.effective_size().unwrap_or(DEFAULT_PER_PAGE);
        Some(page.saturating_sub(1).saturating_mul(per_page))
    }

    /// Page state the result collection reports back to the caller
    pub fn pagination(&self) -> Pagination {
        let per_page = self.effective_size().unwrap_or(DEFAULT_PER_PAGE);
        let current_page = match (self.page, self.effective_from()) {
            (Some(page), _) => page.max(1),
            (None, Some(from)) if per_page > 0 => from / per_page + 1,
            _ => 1,
        };
        Pagination::new(current_page, per_page)
    }

    fn filter_value(&self) -> Option<Value> {
        match self.filters.len() {
            0 => None,
            1 => Some(self.filters[0].to_value()),
            _ => {
                let filters: Vec<Value> = self.filters.iter().map(Filter::to_value).collect();
                Some(json!({ "and": filters }))
            }
        }
    }

    /// Render the request body
    pub fn to_value(&self) -> Value {
        let mut body = Map::new();

        match (self.query.to_value(), self.filter_value()) {
            (Some(query), Some(filter)) => {
                body.insert(
                    "query".to_string(),
                    json!({ "filtered": { "query": query, "filter": filter } }),
                );
            }
            (Some(query), None) => {
                body.insert("query".to_string(), query);
            }
            (None, Some(filter)) => {
                body.insert("filter".to_string(), filter);
            }
            (None, None) => {}
        }

        if !self.sort.is_empty() {
            body.insert("sort".to_string(), self.sort.to_value());
        }

        if !self.facets.is_empty() {
            let mut facets = Map::new();
            for facet in &self.facets {
                facets.insert(facet.name().to_string(), facet.body());
            }
            body.insert("facets".to_string(), Value::Object(facets));
        }

        if let Some(from) = self.effective_from() {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.effective_size() {
            body.insert("size".to_string(), json!(size));
        }

        if !self.highlight.is_empty() {
            body.insert("highlight".to_string(), self.highlight.to_value());
        }
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), json!(self.fields));
        }
        if self.version {
            body.insert("version".to_string(), json!(true));
        }

        Value::Object(body)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// `[<indices>[/<types>]/]_search`, each name escaped, lists comma-joined.
    ///
    /// No indices searches all of them; with types that is spelled `_all`.
    pub fn path(&self) -> String {
        let join = |names: &[String]| {
            names
                .iter()
                .map(|name| encode_segment(name))
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut path = String::new();
        if !self.indices.is_empty() {
            path.push_str(&join(&self.indices));
            path.push('/');
        } else if !self.types.is_empty() {
            path.push_str("_all/");
        }
        if !self.types.is_empty() {
            path.push_str(&join(&self.types));
            path.push('/');
        }
        path.push_str("_search");
        path
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }

    pub fn to_request(&self, base_url: &str) -> Result<Request> {
        Ok(Request::new(Method::Post, self.url(base_url)).with_body(self.to_json()?))
    }

    /// The request as a curl command line, handy for reproducing a search by hand
    pub fn to_curl(&self, base_url: &str) -> Result<String> {
        Ok(self.to_request(base_url)?.to_curl())
    }
}
