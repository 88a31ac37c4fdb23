//! Building blocks of the search DSL
//!
//! Each piece renders to the engine's JSON query grammar through `to_value`.
//! Option arguments are JSON objects merged into the rendered clause; `Value::Null`
//! means "no options" and non-object values are ignored.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

fn merge_options(target: &mut Map<String, Value>, options: Value) {
    match options {
        Value::Object(map) => {
            for (key, value) in map {
                target.insert(key, value);
            }
        }
        Value::Null => {}
        other => tracing::debug!("Ignoring non-object options: {}", other),
    }
}

/// The top-level query clause. Only one clause is ever kept: each builder call
/// replaces whatever was set before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    value: Option<Value>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{"term": {field: value}}`
    pub fn term(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.value = Some(json!({ "term": { field: value.into() } }));
        self
    }

    /// `{"terms": {field: [values], "minimum_match": n}}`
    pub fn terms<I, V>(&mut self, field: &str, values: I, minimum_match: Option<u64>) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let mut terms = Map::new();
        terms.insert(field.to_string(), Value::Array(values));
        if let Some(n) = minimum_match {
            terms.insert("minimum_match".to_string(), json!(n));
        }
        self.value = Some(json!({ "terms": terms }));
        self
    }

    /// `{"query_string": {"query": text, "default_field": f}}`
    pub fn string(&mut self, text: &str, default_field: Option<&str>) -> &mut Self {
        let mut query_string = Map::new();
        query_string.insert("query".to_string(), json!(text));
        if let Some(field) = default_field {
            query_string.insert("default_field".to_string(), json!(field));
        }
        self.value = Some(json!({ "query_string": query_string }));
        self
    }

    /// `{"match_all": {}}`
    pub fn all(&mut self) -> &mut Self {
        self.value = Some(json!({ "match_all": {} }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn to_value(&self) -> Option<Value> {
        self.value.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterPayload {
    Options(Value),
    Positional(Vec<Value>),
}

/// A named filter, rendered as `{filter_type: payload}`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    filter_type: String,
    payload: FilterPayload,
}

impl Filter {
    pub fn new(filter_type: impl Into<String>, options: Value) -> Self {
        Self {
            filter_type: filter_type.into(),
            payload: FilterPayload::Options(options),
        }
    }

    /// A single argument becomes the payload itself, several are kept as an ordered list
    pub fn from_args(filter_type: impl Into<String>, mut args: Vec<Value>) -> Self {
        let payload = if args.len() == 1 {
            FilterPayload::Options(args.remove(0))
        } else {
            FilterPayload::Positional(args)
        };
        Self {
            filter_type: filter_type.into(),
            payload,
        }
    }

    pub fn filter_type(&self) -> &str {
        &self.filter_type
    }

    pub fn to_value(&self) -> Value {
        let payload = match &self.payload {
            FilterPayload::Options(options) => options.clone(),
            FilterPayload::Positional(args) => Value::Array(args.clone()),
        };
        let mut map = Map::new();
        map.insert(self.filter_type.clone(), payload);
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortEntry {
    /// Bare field name, ascending implied
    Field(String),
    FieldWithDirection(String, SortDirection),
    /// Anything else the engine accepts for a sort key, e.g. `{"_geo_distance": {...}}`.
    /// Only string and object arguments are kept; any other argument renders the bare name.
    Raw(String, Value),
}

impl SortEntry {
    pub fn to_value(&self) -> Value {
        match self {
            SortEntry::Field(name) => json!(name),
            SortEntry::FieldWithDirection(name, direction) => json!({ name: direction.as_str() }),
            SortEntry::Raw(name, value @ (Value::String(_) | Value::Object(_))) => {
                json!({ name: value })
            }
            SortEntry::Raw(name, _) => json!(name),
        }
    }
}

/// Ordered list of sort entries; serialization follows insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    entries: Vec<SortEntry>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(&mut self, field: &str) -> &mut Self {
        self.entries.push(SortEntry::Field(field.to_string()));
        self
    }

    pub fn by_direction(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.entries
            .push(SortEntry::FieldWithDirection(field.to_string(), direction));
        self
    }

    pub fn raw(&mut self, name: &str, value: Value) -> &mut Self {
        self.entries.push(SortEntry::Raw(name.to_string(), value));
        self
    }

    pub fn push(&mut self, entry: SortEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[SortEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(SortEntry::to_value).collect())
    }
}

/// Named aggregation computed by the engine alongside the hits.
///
/// Options given at creation time land inside the facet object next to the
/// kind-specific clause, and win over it on key collision.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    name: String,
    options: Map<String, Value>,
    value: Map<String, Value>,
}

impl Facet {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        let mut merged = Map::new();
        merge_options(&mut merged, options);
        Self {
            name: name.into(),
            options: merged,
            value: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{"terms": {"field": field, ...options}}`
    pub fn terms(&mut self, field: &str, options: Value) -> &mut Self {
        let mut terms = Map::new();
        terms.insert("field".to_string(), json!(field));
        merge_options(&mut terms, options);
        self.value = Map::new();
        self.value.insert("terms".to_string(), Value::Object(terms));
        self
    }

    /// `{"date_histogram": {"field": field, "interval": interval, ...options}}`
    pub fn date(&mut self, field: &str, interval: Option<&str>, options: Value) -> &mut Self {
        let mut histogram = Map::new();
        histogram.insert("field".to_string(), json!(field));
        histogram.insert("interval".to_string(), json!(interval.unwrap_or("day")));
        merge_options(&mut histogram, options);
        self.value = Map::new();
        self.value
            .insert("date_histogram".to_string(), Value::Object(histogram));
        self
    }

    /// `{"range": {"field": field, "ranges": [...], ...options}}`
    pub fn range(&mut self, field: &str, ranges: Vec<Value>, options: Value) -> &mut Self {
        let mut range = Map::new();
        range.insert("field".to_string(), json!(field));
        range.insert("ranges".to_string(), Value::Array(ranges));
        merge_options(&mut range, options);
        self.value = Map::new();
        self.value.insert("range".to_string(), Value::Object(range));
        self
    }

    /// The inner facet object, without the name wrapper
    pub fn body(&self) -> Value {
        let mut body = self.value.clone();
        for (key, value) in &self.options {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.body());
        Value::Object(map)
    }
}

/// Highlighted fields requested with the search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlight {
    fields: Vec<(String, Value)>,
    options: Map<String, Value>,
}

impl Highlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, name: &str) -> &mut Self {
        self.fields.push((name.to_string(), json!({})));
        self
    }

    pub fn field_with(&mut self, name: &str, options: Value) -> &mut Self {
        let mut field_options = Map::new();
        merge_options(&mut field_options, options);
        self.fields
            .push((name.to_string(), Value::Object(field_options)));
        self
    }

    /// Global options such as `pre_tags` / `post_tags`
    pub fn options(&mut self, options: Value) -> &mut Self {
        merge_options(&mut self.options, options);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        for (name, options) in &self.fields {
            fields.insert(name.clone(), options.clone());
        }
        let mut highlight = Map::new();
        highlight.insert("fields".to_string(), Value::Object(fields));
        for (key, value) in &self.options {
            highlight.insert(key.clone(), value.clone());
        }
        Value::Object(highlight)
    }
}

macro_rules! serialize_via_value {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    self.to_value().serialize(serializer)
                }
            }
        )*
    };
}

serialize_via_value!(Filter, Sort, Facet, Highlight);
