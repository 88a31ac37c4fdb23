use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// `ceil(total / per_page)`, never less than one page
pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: u64,
    per_page: u64,
}

impl Pagination {
    pub fn new(current_page: u64, per_page: u64) -> Self {
        Self {
            current_page: current_page.max(1),
            per_page,
        }
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        (self.current_page - 1).saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, crate::search::DEFAULT_PER_PAGE)
    }
}

/// One hit, with its document attributes and the engine's meta fields kept apart
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Option<String>,
    pub doc_type: Option<String>,
    pub index: Option<String>,
    pub score: Option<f64>,
    pub version: Option<u64>,
    pub sort: Option<Value>,
    pub highlight: Option<Value>,
    pub attributes: Map<String, Value>,
}

fn string_field(hit: &Map<String, Value>, key: &str) -> Option<String> {
    match hit.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl Item {
    /// Build an item from a raw hit (or a single-document GET response).
    ///
    /// Attributes come from `_source`; when the search asked for specific
    /// `fields` those are used instead.
    pub fn from_hit(hit: &Value) -> Result<Self> {
        let hit = hit
            .as_object()
            .ok_or_else(|| Error::InvalidResponse(format!("hit is not an object: {}", hit)))?;

        let attributes = match (hit.get("fields"), hit.get("_source")) {
            (Some(Value::Object(fields)), _) => fields.clone(),
            (_, Some(Value::Object(source))) => source.clone(),
            _ => Map::new(),
        };

        Ok(Self {
            id: string_field(hit, "_id"),
            doc_type: string_field(hit, "_type"),
            index: string_field(hit, "_index"),
            score: hit.get("_score").and_then(Value::as_f64),
            version: hit.get("_version").and_then(Value::as_u64),
            sort: hit.get("sort").cloned(),
            highlight: hit.get("highlight").cloned(),
            attributes,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attributes with `id` filled in from the hit when the document has none
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        if let Some(id) = &self.id {
            map.entry("id".to_string())
                .or_insert_with(|| Value::String(id.clone()));
        }
        Value::Object(map)
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

/// Search results as returned by the engine, wrapped by a hit factory
#[derive(Debug, Clone)]
pub struct Collection<T = Item> {
    items: Vec<T>,
    total: u64,
    took: u64,
    facets: Option<Value>,
    pagination: Pagination,
}

fn hits_total(hits: &Map<String, Value>) -> u64 {
    match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        // newer engines report `{"value": n, "relation": "eq"}`
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

impl Collection<Item> {
    pub fn parse(body: &str, pagination: Pagination) -> Result<Self> {
        let response: Value = serde_json::from_str(body)?;
        Self::from_value(&response, pagination, Ok)
    }
}

impl<T> Collection<T> {
    /// Build a collection from a parsed search response, passing every hit through `factory`
    pub fn from_value<F>(response: &Value, pagination: Pagination, mut factory: F) -> Result<Self>
    where
        F: FnMut(Item) -> Result<T>,
    {
        let hits = response
            .get("hits")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::InvalidResponse("missing 'hits' in search response".to_string()))?;

        let raw_hits = match hits.get("hits") {
            Some(Value::Array(raw)) => raw.as_slice(),
            _ => &[],
        };

        let mut items = Vec::with_capacity(raw_hits.len());
        for hit in raw_hits {
            items.push(factory(Item::from_hit(hit)?)?);
        }

        Ok(Self {
            items,
            total: hits_total(hits),
            took: response.get("took").and_then(Value::as_u64).unwrap_or(0),
            facets: response.get("facets").cloned(),
            pagination,
        })
    }

    pub fn results(&self) -> &[T] {
        &self.items
    }

    pub fn into_results(self) -> Vec<T> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total hits reported by the engine, not just this page
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Engine-side time in milliseconds
    pub fn took(&self) -> u64 {
        self.took
    }

    pub fn facets(&self) -> Option<&Value> {
        self.facets.as_ref()
    }

    pub fn total_entries(&self) -> u64 {
        self.total
    }

    pub fn per_page(&self) -> u64 {
        self.pagination.per_page()
    }

    pub fn offset(&self) -> u64 {
        self.pagination.offset()
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.pagination.per_page())
    }

    pub fn current_page(&self) -> u64 {
        self.pagination.current_page()
    }

    pub fn previous_page(&self) -> Option<u64> {
        let current = self.current_page();
        (current > 1).then(|| current - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        let current = self.current_page();
        (current < self.total_pages()).then(|| current + 1)
    }

    pub fn map<U, F>(self, f: F) -> Collection<U>
    where
        F: FnMut(T) -> U,
    {
        Collection {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            took: self.took,
            facets: self.facets,
            pagination: self.pagination,
        }
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> std::ops::Index<usize> for Collection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}
