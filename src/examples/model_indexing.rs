//! Model Indexing Example
//!
//! Keeps an application model in sync with an index through `ModelIndex`
//! and runs typed searches against it.
//!
//! Run with: cargo run --example model_indexing

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tire::{Client, Config, ModelIndex, Searchable, SearchOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Article {
    id: String,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl Searchable for Article {
    fn model_name() -> &'static str {
        "Article"
    }

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn mapping() -> Option<Value> {
        Some(json!({
            "properties": {
                "title": { "type": "string", "analyzer": "snowball" },
                "tags": { "type": "string", "analyzer": "keyword" }
            }
        }))
    }
}

fn article(id: u32, title: &str, tags: &[&str]) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pooled, retrying client built from configuration
    let mut config = Config::default();
    config.transport.kind = tire::TransportKind::Pooled;
    config.retry.enabled = true;
    let client = Client::from_config(&config)?;

    let articles: ModelIndex<Article> = ModelIndex::new(&client);
    println!("Index: {}", articles.index().name());

    articles.index().delete().await?;
    articles.create().await?;

    let batch = vec![
        article(1, "Rust in production", &["rust"]),
        article(2, "Async Rust", &["rust", "tokio"]),
        article(3, "Ruby on Rails", &["ruby"]),
    ];
    let imported = articles.import(&batch, 2).await?;
    println!("Imported {} articles", imported);

    // A single save after the host persisted a change
    let updated = article(3, "Ruby on Rails 3", &["ruby", "rails"]);
    let stored = articles.after_save(&updated).await?;
    println!("Stored {:?} (version {:?})", stored.id, stored.version);

    articles.index().refresh().await?;

    let results = articles
        .search(SearchOptions::page(1, 10), |s| {
            s.query(|q| {
                q.terms("tags", ["rust", "ruby"], Some(1));
            });
        })
        .await?;

    println!("\nPage {} of {}:", results.current_page(), results.total_pages());
    for article in &results {
        println!("  * {} {:?}", article.title, article.tags);
    }

    if let Some(found) = articles.find("2").await? {
        println!("\nFound by id: {}", found.title);
        articles.after_destroy(&found).await?;
        println!("Removed {}", found.id);
    }

    Ok(())
}
