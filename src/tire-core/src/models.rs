use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::results::Item;

pub const DEFAULT_DOCUMENT_TYPE: &str = "document";

/// Anything that can be written to an index
pub trait Indexable {
    fn document_type(&self) -> String;
    fn document_id(&self) -> Option<String>;
    fn to_indexed_json(&self) -> Result<String>;
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Indexable for Value {
    fn document_type(&self) -> String {
        ["_type", "type"]
            .iter()
            .find_map(|key| self.get(*key).and_then(Value::as_str))
            .unwrap_or(DEFAULT_DOCUMENT_TYPE)
            .to_string()
    }

    fn document_id(&self) -> Option<String> {
        ["_id", "id"]
            .iter()
            .find_map(|key| self.get(*key).and_then(id_to_string))
    }

    fn to_indexed_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `BlogPost` -> `blog_post`, `HTTPServer` -> `http_server`
pub fn underscore(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    let mut prev_upper = false;
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            // last capital of an acronym starts the next word
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
            prev_upper = true;
        } else if c == '-' || c == ' ' || c == ':' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
            prev_upper = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            prev_upper = false;
        }
    }
    out
}

/// English plural for index names. Regular forms only.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with('y')
        && !["ay", "ey", "iy", "oy", "uy"].iter().any(|v| lower.ends_with(v))
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// One declared attribute of a persisted model
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    /// Engine field type, e.g. `string`, `integer`, `date`
    pub kind: String,
    pub default: Option<Value>,
    /// Extra mapping options such as `analyzer` or `boost`
    pub options: Map<String, Value>,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            default: None,
            options: Map::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    fn mapping(&self) -> Value {
        let mut mapping = Map::new();
        mapping.insert("type".to_string(), json!(self.kind));
        for (key, value) in &self.options {
            mapping.insert(key.clone(), value.clone());
        }
        Value::Object(mapping)
    }
}

/// Declared attributes of a model stored only in the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    model_name: String,
    properties: Vec<Property>,
}

impl Schema {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.retain(|p| p.name != property.name);
        self.properties.push(property);
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn document_type(&self) -> String {
        underscore(&self.model_name)
    }

    pub fn index_name(&self) -> String {
        pluralize(&self.document_type())
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn declares(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    /// `{"<type>": {"properties": {...}}}`
    pub fn mapping(&self) -> Value {
        let mut properties = Map::new();
        for property in &self.properties {
            properties.insert(property.name.clone(), property.mapping());
        }
        let mut mapping = Map::new();
        mapping.insert(
            self.document_type(),
            json!({ "properties": Value::Object(properties) }),
        );
        Value::Object(mapping)
    }
}

/// Attribute store backed by a schema: only declared names can be read or written
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    id: Option<String>,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema
            .properties()
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        Self {
            schema,
            id: None,
            values,
        }
    }

    /// Populate from a search hit; undeclared attributes in the document are dropped
    pub fn from_item(schema: Arc<Schema>, item: &Item) -> Self {
        let mut record = Self::new(schema);
        record.id = item.id.clone();
        for (name, value) in &item.attributes {
            if record.schema.declares(name) {
                record.values.insert(name.clone(), value.clone());
            } else if name != "id" {
                tracing::debug!(
                    "Dropping undeclared attribute '{}' for {}",
                    name,
                    record.schema.model_name()
                );
            }
        }
        record
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn get(&self, name: &str) -> Result<Option<&Value>> {
        if !self.schema.declares(name) {
            return Err(Error::UnknownAttribute(name.to_string()));
        }
        Ok(self.values.get(name))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if !self.schema.declares(name) {
            return Err(Error::UnknownAttribute(name.to_string()));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl Indexable for Record {
    fn document_type(&self) -> String {
        self.schema.document_type()
    }

    fn document_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn to_indexed_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.values)?)
    }
}
