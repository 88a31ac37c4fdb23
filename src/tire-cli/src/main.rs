use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tire::{Client, Config, SearchOptions, SortDirection};

mod cli;
mod telemetry;

use cli::{split_list, Cli, Command, ImportArgs, SearchArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_telemetry(&cli.log_dir, cli.verbose)?;

    let mut config = Config::load(&cli.config.to_string_lossy()).unwrap_or_else(|e| {
        tracing::warn!("Failed to load {}: {}, using defaults", cli.config.display(), e);
        Config::default()
    });
    if let Some(url) = cli.url {
        config.url = url;
    }
    config.validate()?;

    tracing::debug!(
        "Using {} via {:?} transport (retry={})",
        config.base_url(),
        config.transport.kind,
        config.retry.enabled
    );

    let client = Client::from_config(&config)?;

    let outcome = match cli.command {
        Command::Search(args) => search(&client, args).await,
        Command::Create { index, mapping } => create(&client, &index, mapping.as_deref()).await,
        Command::Delete { index } => delete(&client, &index).await,
        Command::Get { index, doc_type, id } => get(&client, &index, &doc_type, &id).await,
        Command::Mapping { index } => {
            let mapping = client.index(index).mapping().await?;
            println!("{}", serde_json::to_string_pretty(&mapping)?);
            Ok(())
        }
        Command::Import(args) => import(&client, args).await,
    };

    let stats = client.stats().snapshot();
    tracing::debug!(
        "{} requests, {} searches, error rate {:.2}",
        stats.requests,
        stats.searches,
        stats.error_rate()
    );

    outcome
}

/// `field` or `field:asc|desc`
fn parse_sort(arg: &str) -> (String, Option<SortDirection>) {
    match arg.rsplit_once(':') {
        Some((field, direction)) => match direction.parse() {
            Ok(direction) => (field.to_string(), Some(direction)),
            Err(_) => (arg.to_string(), None),
        },
        None => (arg.to_string(), None),
    }
}

async fn search(client: &Client, args: SearchArgs) -> Result<()> {
    let mut options = SearchOptions {
        page: Some(args.page),
        per_page: args.per_page,
        ..Default::default()
    };
    if let Some(types) = &args.types {
        options.types = split_list(types);
    }

    let build = |s: &mut tire::SearchRequest| {
        s.query(|q| match &args.query {
            Some(text) => {
                q.string(text, None);
            }
            None => {
                q.all();
            }
        });
        if !args.sort.is_empty() {
            s.sort(|sort| {
                for arg in &args.sort {
                    match parse_sort(arg) {
                        (field, Some(direction)) => sort.by_direction(&field, direction),
                        (field, None) => sort.by(&field),
                    };
                }
            });
        }
        for field in &args.facet {
            s.facet(field, Value::Null, |f| {
                f.terms(field, Value::Null);
            });
        }
        if let Some(fields) = &args.fields {
            s.fields(split_list(fields));
        }
    };

    let indices = split_list(&args.indices);

    if args.curl {
        let mut request = tire::SearchRequest::new(indices).with_options(options);
        build(&mut request);
        println!("{}", request.to_curl(client.base_url())?);
        return Ok(());
    }

    let results = client.search(indices, options, build).await?;

    println!(
        "# {} hits, page {} of {} ({} ms)",
        results.total(),
        results.current_page(),
        results.total_pages(),
        results.took()
    );
    for item in &results {
        println!("{}", serde_json::to_string(&item.to_value())?);
    }
    if let Some(facets) = results.facets() {
        println!("# facets");
        println!("{}", serde_json::to_string_pretty(facets)?);
    }
    Ok(())
}

async fn create(client: &Client, name: &str, mapping: Option<&std::path::Path>) -> Result<()> {
    let mappings = match mapping {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading mapping file {}", path.display()))?;
            Some(serde_json::from_str::<Value>(&contents)?)
        }
        None => None,
    };

    client.index(name).create(mappings).await?;
    tracing::info!("Created index '{}'", name);
    Ok(())
}

async fn delete(client: &Client, name: &str) -> Result<()> {
    if client.index(name).delete().await? {
        tracing::info!("Deleted index '{}'", name);
    } else {
        tracing::warn!("Index '{}' does not exist", name);
    }
    Ok(())
}

async fn get(client: &Client, name: &str, doc_type: &str, id: &str) -> Result<()> {
    match client.index(name).retrieve(doc_type, id).await? {
        Some(item) => println!("{}", serde_json::to_string_pretty(&item.to_value())?),
        None => anyhow::bail!("{}/{}/{} not found", name, doc_type, id),
    }
    Ok(())
}

fn read_documents(contents: &str) -> Result<Vec<Value>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {} is not valid JSON", n + 1))
        })
        .collect()
}

async fn import(client: &Client, args: ImportArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let documents = read_documents(&contents)?;

    let index = client.index(&args.index);
    let count = index.import(&documents, args.per_page).await?;
    index.refresh().await?;

    tracing::info!("Imported {} documents into '{}'", count, args.index);
    println!("{}", json!({ "index": args.index, "imported": count }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("title"), ("title".to_string(), None));
        assert_eq!(
            parse_sort("published_on:desc"),
            ("published_on".to_string(), Some(SortDirection::Desc))
        );
        // a colon that is not a direction stays part of the field name
        assert_eq!(parse_sort("meta:author"), ("meta:author".to_string(), None));
    }

    #[test]
    fn test_read_documents_skips_blank_lines() {
        let docs = read_documents("{\"id\":1}\n\n{\"id\":2}\n").unwrap();
        assert_eq!(docs, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn test_read_documents_reports_line() {
        let err = read_documents("{\"id\":1}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
