use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::Client;
use tire_core::http::encode_segment as segment;
use crate::model::Importable;
use crate::{
    Collection, Error, Indexable, Item, Method, Request, Response, Result, SearchOptions,
    SearchRequest,
};

/// Outcome of storing a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub id: Option<String>,
    pub version: Option<u64>,
}

/// A named index on the engine
#[derive(Debug, Clone)]
pub struct Index {
    client: Client,
    name: String,
}

impl Index {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &[&str]) -> String {
        let mut url = self.client.url(&segment(&self.name));
        for part in path {
            url.push('/');
            url.push_str(part);
        }
        url
    }

    async fn send(&self, request: Request) -> Result<Response> {
        self.client.send(request).await
    }

    /// Create the index, optionally with type mappings (`{"<type>": {"properties": ...}}`)
    pub async fn create(&self, mappings: Option<Value>) -> Result<()> {
        let body = match mappings {
            Some(mappings) => json!({ "mappings": mappings }),
            None => json!({}),
        };
        self.create_with(body).await
    }

    /// Create the index from a full definition (`settings` and/or `mappings`)
    pub async fn create_with(&self, definition: Value) -> Result<()> {
        let request = Request::new(Method::Post, self.url(&[]))
            .with_body(serde_json::to_string(&definition)?);
        self.send(request).await?.error_for_status()?;
        info!("Created index '{}'", self.name);
        Ok(())
    }

    /// Delete the index; `false` when it did not exist
    pub async fn delete(&self) -> Result<bool> {
        let response = self.send(Request::new(Method::Delete, self.url(&[]))).await?;
        if response.is_not_found() {
            debug!("Index '{}' did not exist", self.name);
            return Ok(false);
        }
        response.error_for_status()?;
        info!("Deleted index '{}'", self.name);
        Ok(true)
    }

    pub async fn exists(&self) -> Result<bool> {
        let response = self.send(Request::new(Method::Head, self.url(&[]))).await?;
        match response.status {
            200 => Ok(true),
            404 => Ok(false),
            _ => response.error_for_status().map(|_| false),
        }
    }

    /// Make recent writes visible to search
    pub async fn refresh(&self) -> Result<()> {
        let request = Request::new(Method::Post, self.url(&["_refresh"]));
        self.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// Current mappings of this index, keyed by document type
    pub async fn mapping(&self) -> Result<Value> {
        let response = self
            .send(Request::new(Method::Get, self.url(&["_mapping"])))
            .await?
            .error_for_status()?;
        let mut body: Value = response.json()?;

        // some engine versions nest the answer under the index name and/or "mappings"
        if let Some(inner) = body.get_mut(&self.name).map(Value::take) {
            body = inner;
        }
        if let Some(inner) = body.get_mut("mappings").map(Value::take) {
            body = inner;
        }
        Ok(body)
    }

    /// Store one document; the engine assigns an id when the document has none
    pub async fn store<D: Indexable + ?Sized>(&self, document: &D) -> Result<Stored> {
        let doc_type = document.document_type();
        let id = document.document_id();
        self.store_raw(&doc_type, id.as_deref(), document.to_indexed_json()?)
            .await
    }

    pub async fn store_raw(&self, doc_type: &str, id: Option<&str>, json: String) -> Result<Stored> {
        let doc_type = segment(doc_type);
        let url = match id {
            Some(id) => self.url(&[&doc_type, &segment(id)]),
            None => self.url(&[&doc_type]),
        };
        let method = if id.is_some() { Method::Put } else { Method::Post };

        let response = self
            .send(Request::new(method, url).with_body(json))
            .await?
            .error_for_status()?;
        let body: Value = response.json()?;

        Ok(Stored {
            id: body
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| id.map(str::to_string)),
            version: body.get("_version").and_then(Value::as_u64),
        })
    }

    /// Newline-delimited bulk payload: an action line and a source line per document
    pub fn bulk_payload<D: Indexable>(&self, documents: &[D]) -> Result<String> {
        let mut payload = String::new();
        for document in documents {
            let mut action = json!({
                "_index": self.name,
                "_type": document.document_type(),
            });
            if let Some(id) = document.document_id() {
                action["_id"] = json!(id);
            }
            payload.push_str(&serde_json::to_string(&json!({ "index": action }))?);
            payload.push('\n');
            payload.push_str(&document.to_indexed_json()?);
            payload.push('\n');
        }
        Ok(payload)
    }

    /// Store many documents in one request
    pub async fn bulk_store<D: Indexable>(&self, documents: &[D]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let payload = self.bulk_payload(documents)?;
        let response = self
            .send(Request::new(Method::Post, self.url(&["_bulk"])).with_body(payload))
            .await?
            .error_for_status()?;

        if let Ok(body) = response.json::<Value>() {
            if body.get("errors").and_then(Value::as_bool) == Some(true) {
                let failed = body
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter(|item| item.pointer("/index/error").is_some())
                            .count()
                    })
                    .unwrap_or(0);
                warn!(
                    "Bulk store into '{}' reported {} failed documents",
                    self.name, failed
                );
            }
        }

        debug!("Bulk stored {} documents into '{}'", documents.len(), self.name);
        Ok(())
    }

    /// Page through `source` and bulk store every page; returns the number of documents sent
    pub async fn import<S>(&self, source: &S, per_page: u64) -> Result<usize>
    where
        S: Importable + ?Sized,
        S::Document: Indexable,
    {
        if per_page == 0 {
            return Err(Error::Configuration(
                "import needs a page size of at least 1".to_string(),
            ));
        }

        let mut total = 0;
        let mut page = 1;
        loop {
            let documents = source.paginate(page, per_page).await?;
            if documents.is_empty() {
                break;
            }
            self.bulk_store(&documents).await?;
            total += documents.len();
            debug!("Imported page {} ({} documents) into '{}'", page, documents.len(), self.name);

            if (documents.len() as u64) < per_page {
                break;
            }
            page += 1;
        }

        info!("Imported {} documents into '{}'", total, self.name);
        Ok(total)
    }

    /// Fetch one document; `None` when the engine does not know it
    pub async fn retrieve(&self, doc_type: &str, id: &str) -> Result<Option<Item>> {
        let url = self.url(&[&segment(doc_type), &segment(id)]);
        let response = self.send(Request::new(Method::Get, url)).await?;
        if response.is_not_found() {
            return Ok(None);
        }

        let body: Value = response.error_for_status()?.json()?;
        let found = ["found", "exists"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_bool))
            .unwrap_or(true);
        if !found {
            return Ok(None);
        }
        Item::from_hit(&body).map(Some)
    }

    /// Delete one document; `false` when it was not there
    pub async fn remove(&self, doc_type: &str, id: &str) -> Result<bool> {
        let url = self.url(&[&segment(doc_type), &segment(id)]);
        let response = self.send(Request::new(Method::Delete, url)).await?;
        if response.is_not_found() {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    /// Search this index only
    pub async fn search<F>(&self, options: SearchOptions, build: F) -> Result<Collection<Item>>
    where
        F: FnOnce(&mut SearchRequest),
    {
        self.client.search([self.name.as_str()], options, build).await
    }
}
