//! Simple Search Example
//!
//! Creates an index, stores a few articles and runs a filtered, faceted search.
//! Needs an engine listening on http://localhost:9200.
//!
//! Run with: cargo run --example simple_search

use serde_json::json;
use tire::{Client, SearchOptions, SortDirection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new("http://localhost:9200");
    let articles = client.index("articles");

    articles.delete().await?;
    articles
        .create(Some(json!({
            "article": {
                "properties": {
                    "title": { "type": "string", "boost": 2.0, "analyzer": "snowball" },
                    "tags": { "type": "string", "analyzer": "keyword" },
                    "published_on": { "type": "date" }
                }
            }
        })))
        .await?;

    let documents = vec![
        json!({ "id": "1", "type": "article", "title": "One", "tags": ["ruby"], "published_on": "2011-01-01" }),
        json!({ "id": "2", "type": "article", "title": "Two", "tags": ["ruby", "python"], "published_on": "2011-01-02" }),
        json!({ "id": "3", "type": "article", "title": "Three", "tags": ["java"], "published_on": "2011-01-02" }),
        json!({ "id": "4", "type": "article", "title": "Four", "tags": ["ruby", "php"], "published_on": "2011-01-03" }),
    ];
    articles.bulk_store(&documents).await?;
    articles.refresh().await?;
    println!("Stored {} articles\n", documents.len());

    let results = client
        .search(["articles"], SearchOptions::page(1, 10), |s| {
            s.query(|q| {
                q.string("title:T*", None);
            })
            .filter("terms", json!({ "tags": ["ruby"] }))
            .sort(|sort| {
                sort.by_direction("title", SortDirection::Desc);
            })
            .facet("global-tags", json!({ "global": true }), |f| {
                f.terms("tags", serde_json::Value::Null);
            })
            .facet("current-tags", serde_json::Value::Null, |f| {
                f.terms("tags", serde_json::Value::Null);
            });
        })
        .await?;

    println!("Matching articles ({} total):", results.total());
    for item in &results {
        println!(
            "  * {} [tags: {}]",
            item.get("title").and_then(|v| v.as_str()).unwrap_or("?"),
            item.get("tags").map(|v| v.to_string()).unwrap_or_default()
        );
    }

    if let Some(facets) = results.facets() {
        println!("\nCounts by tag:");
        for (name, facet) in facets.as_object().into_iter().flatten() {
            println!("  {}:", name);
            for term in facet["terms"].as_array().into_iter().flatten() {
                println!("    {:<10} {}", term["term"].as_str().unwrap_or("?"), term["count"]);
            }
        }
    }

    let stats = client.stats().snapshot();
    println!("\n{} requests, {} searches", stats.requests, stats.searches);

    Ok(())
}
