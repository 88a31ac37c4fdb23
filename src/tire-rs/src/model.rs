//! Search and indexing behaviour for application models.
//!
//! The host persistence layer keeps owning the records; after it saves or
//! destroys one it calls [`ModelIndex::after_save`] / [`ModelIndex::after_destroy`]
//! to keep the engine in sync.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::Client;
use crate::index::{Index, Stored};
use crate::{Collection, Error, Indexable, Result, SearchOptions, SearchRequest};
use tire_core::models::{pluralize, underscore};

/// A source of documents that can be walked page by page for bulk import
#[async_trait::async_trait]
pub trait Importable: Send + Sync {
    type Document: Send + Sync;

    /// One page of documents, 1-based. An empty page ends the import.
    async fn paginate(&self, _page: u64, _per_page: u64) -> Result<Vec<Self::Document>> {
        Err(Error::Configuration(format!(
            "{} does not support pagination, cannot import it",
            std::any::type_name::<Self>()
        )))
    }
}

#[async_trait::async_trait]
impl<D: Clone + Send + Sync> Importable for Vec<D> {
    type Document = D;

    async fn paginate(&self, page: u64, per_page: u64) -> Result<Vec<D>> {
        let start = page.saturating_sub(1).saturating_mul(per_page) as usize;
        let end = start.saturating_add(per_page as usize).min(self.len());
        Ok(self.get(start..end).map(<[D]>::to_vec).unwrap_or_default())
    }
}

/// An application model whose instances are mirrored into an index
pub trait Searchable: Serialize + DeserializeOwned + Send + Sync {
    /// Type name the index name and document type derive from, e.g. `BlogPost`
    fn model_name() -> &'static str;

    fn id(&self) -> Option<String>;

    /// Plural, lower-snake model name: `BlogPost` -> `blog_posts`
    fn index_name() -> String {
        pluralize(&underscore(Self::model_name()))
    }

    /// Lower-snake model name: `BlogPost` -> `blog_post`
    fn document_type() -> String {
        underscore(Self::model_name())
    }

    /// Field mappings for the document type, `{"properties": {...}}`
    fn mapping() -> Option<Value> {
        None
    }
}

/// Borrowed model seen through the `Indexable` lens
struct ModelDocument<'a, M>(&'a M);

impl<M: Searchable> Indexable for ModelDocument<'_, M> {
    fn document_type(&self) -> String {
        M::document_type()
    }

    fn document_id(&self) -> Option<String> {
        self.0.id()
    }

    fn to_indexed_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.0)?)
    }
}

/// The index backing model `M`
pub struct ModelIndex<M> {
    index: Index,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for ModelIndex<M> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Searchable> ModelIndex<M> {
    pub fn new(client: &Client) -> Self {
        Self {
            index: client.index(M::index_name()),
            _model: PhantomData,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Create the index with the model's mapping, unless it already exists
    pub async fn create(&self) -> Result<bool> {
        if self.index.exists().await? {
            return Ok(false);
        }
        self.index.create(model_mappings::<M>()).await?;
        Ok(true)
    }

    /// Search the model's index and type, deserializing every hit into `M`
    pub async fn search<F>(&self, options: SearchOptions, build: F) -> Result<Collection<M>>
    where
        F: FnOnce(&mut SearchRequest),
    {
        let mut options = options;
        if options.types.is_empty() {
            options.types = vec![M::document_type()];
        }
        self.index
            .client()
            .search_with([self.index.name()], options, build, |item| item.deserialize::<M>())
            .await
    }

    pub async fn find(&self, id: &str) -> Result<Option<M>> {
        match self.index.retrieve(&M::document_type(), id).await? {
            Some(item) => item.deserialize().map(Some),
            None => Ok(None),
        }
    }

    /// Call after the model was persisted
    pub async fn after_save(&self, model: &M) -> Result<Stored> {
        debug!("Updating index '{}' after save", self.index.name());
        self.index.store(&ModelDocument(model)).await
    }

    /// Call after the model was destroyed
    pub async fn after_destroy(&self, model: &M) -> Result<bool> {
        let id = model.id().ok_or_else(|| {
            Error::Configuration(format!(
                "cannot remove a {} without an id from the index",
                M::model_name()
            ))
        })?;
        debug!("Removing {} '{}' from index '{}'", M::model_name(), id, self.index.name());
        self.index.remove(&M::document_type(), &id).await
    }

    /// Bulk import every model instance `source` yields
    pub async fn import<S>(&self, source: &S, per_page: u64) -> Result<usize>
    where
        S: Importable<Document = M> + ?Sized,
    {
        self.index.import(&ModelSource(source), per_page).await
    }
}

/// Adapts an `Importable` of models into one of indexable documents
struct ModelSource<'a, S: ?Sized>(&'a S);

/// Owned copy of a model's indexed form, produced per import page
struct IndexedModel {
    doc_type: String,
    id: Option<String>,
    json: String,
}

impl Indexable for IndexedModel {
    fn document_type(&self) -> String {
        self.doc_type.clone()
    }

    fn document_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn to_indexed_json(&self) -> Result<String> {
        Ok(self.json.clone())
    }
}

#[async_trait::async_trait]
impl<'a, M, S> Importable for ModelSource<'a, S>
where
    M: Searchable,
    S: Importable<Document = M> + ?Sized,
{
    type Document = IndexedModel;

    async fn paginate(&self, page: u64, per_page: u64) -> Result<Vec<IndexedModel>> {
        self.0
            .paginate(page, per_page)
            .await?
            .iter()
            .map(|model| -> Result<IndexedModel> {
                let document = ModelDocument(model);
                Ok(IndexedModel {
                    doc_type: document.document_type(),
                    id: document.document_id(),
                    json: document.to_indexed_json()?,
                })
            })
            .collect()
    }
}

/// `{"<type>": {"properties": ...}}` for a single model, as sent on index creation
pub fn model_mappings<M: Searchable>() -> Option<Value> {
    M::mapping().map(|mapping| {
        let mut mappings = serde_json::Map::new();
        mappings.insert(M::document_type(), mapping);
        Value::Object(mappings)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct BlogPost {
        id: String,
        title: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Searchable for BlogPost {
        fn model_name() -> &'static str {
            "BlogPost"
        }

        fn id(&self) -> Option<String> {
            Some(self.id.clone())
        }

        fn mapping() -> Option<Value> {
            Some(json!({ "properties": { "title": { "type": "string", "analyzer": "snowball" } } }))
        }
    }

    struct Unpaginated;

    #[async_trait::async_trait]
    impl Importable for Unpaginated {
        type Document = BlogPost;
    }

    fn post(id: &str) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: format!("Post {}", id),
            tags: vec!["rust".to_string()],
        }
    }

    fn posts(mock: &std::sync::Arc<MockTransport>) -> ModelIndex<BlogPost> {
        ModelIndex::new(&Client::with_transport("http://localhost:9200", mock.clone()))
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(BlogPost::index_name(), "blog_posts");
        assert_eq!(BlogPost::document_type(), "blog_post");
        assert_eq!(
            model_mappings::<BlogPost>(),
            Some(json!({ "blog_post": { "properties": { "title": { "type": "string", "analyzer": "snowball" } } } }))
        );
    }

    #[tokio::test]
    async fn test_create_sends_model_mapping() {
        let mock = MockTransport::new().reply(404, "").reply(200, r#"{"ok":true}"#);

        assert!(posts(&mock).create().await.unwrap());

        let request = mock.last();
        assert_eq!(request.url, "http://localhost:9200/blog_posts");
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "mappings": model_mappings::<BlogPost>().unwrap() }));
    }

    #[tokio::test]
    async fn test_create_skips_existing_index() {
        let mock = MockTransport::new().reply(200, "");
        assert!(!posts(&mock).create().await.unwrap());
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_save_and_destroy_hooks() {
        let mock = MockTransport::new()
            .reply(200, r#"{"ok":true,"_id":"7","_version":1}"#)
            .reply(200, r#"{"ok":true,"found":true}"#);
        let index = posts(&mock);

        let stored = index.after_save(&post("7")).await.unwrap();
        assert_eq!(stored.id.as_deref(), Some("7"));
        assert!(index.after_destroy(&post("7")).await.unwrap());

        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://localhost:9200/blog_posts/blog_post/7");
        let body: BlogPost = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, post("7"));
        assert_eq!(requests[1].method, crate::Method::Delete);
    }

    #[tokio::test]
    async fn test_typed_search() {
        let mock = MockTransport::new().reply(
            200,
            r#"{"took":1,"hits":{"total":2,"hits":[
                {"_id":"1","_source":{"title":"First"}},
                {"_id":"2","_source":{"title":"Second","tags":["go"]}}
            ]}}"#,
        );

        let results = posts(&mock)
            .search(SearchOptions::default(), |s| {
                s.query(|q| {
                    q.string("title:*", None);
                });
            })
            .await
            .unwrap();

        assert_eq!(mock.last().url, "http://localhost:9200/blog_posts/blog_post/_search");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[1].tags, vec!["go".to_string()]);
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let mock = MockTransport::new().reply(404, r#"{"exists":false}"#);
        assert!(posts(&mock).find("404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_models() {
        let mock = MockTransport::new();
        let source: Vec<BlogPost> = (1..=3).map(|i| post(&i.to_string())).collect();

        assert_eq!(posts(&mock).import(&source, 10).await.unwrap(), 3);

        let body = mock.last().body.unwrap();
        let first: Value = serde_json::from_str(body.lines().next().unwrap()).unwrap();
        assert_eq!(
            first,
            json!({ "index": { "_index": "blog_posts", "_type": "blog_post", "_id": "1" } })
        );
    }

    #[tokio::test]
    async fn test_import_without_pagination_fails_fast() {
        let mock = MockTransport::new();
        let result = posts(&mock).import(&Unpaginated, 10).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_vec_pagination() {
        let source = vec![1, 2, 3, 4, 5];
        assert_eq!(source.paginate(1, 2).await.unwrap(), vec![1, 2]);
        assert_eq!(source.paginate(3, 2).await.unwrap(), vec![5]);
        assert!(source.paginate(4, 2).await.unwrap().is_empty());
    }
}
