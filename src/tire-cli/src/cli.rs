use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tire", about = "Search, index and inspect documents on a search engine")]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = "tire.json")]
    pub config: PathBuf,

    /// Override the engine URL from the configuration
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Directory for rotated log files
    #[arg(long, global = true, default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search one or more indices
    Search(SearchArgs),
    /// Create an index, optionally with a mapping file
    Create {
        index: String,
        /// JSON file with `{"<type>": {"properties": {...}}}`
        #[arg(long)]
        mapping: Option<PathBuf>,
    },
    /// Delete an index
    Delete { index: String },
    /// Fetch one document by type and id
    Get {
        index: String,
        doc_type: String,
        id: String,
    },
    /// Print the mappings of an index
    Mapping { index: String },
    /// Bulk import a JSON-lines file into an index
    Import(ImportArgs),
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Comma-separated index names
    pub indices: String,

    /// Query string; matches everything when omitted
    pub query: Option<String>,

    /// Restrict to document types (comma-separated)
    #[arg(long = "type")]
    pub types: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u64,

    #[arg(long)]
    pub per_page: Option<u64>,

    /// Sort by field, optionally `field:asc|desc` (repeatable)
    #[arg(long)]
    pub sort: Vec<String>,

    /// Terms facet on a field (repeatable)
    #[arg(long)]
    pub facet: Vec<String>,

    /// Return only these fields (comma-separated)
    #[arg(long)]
    pub fields: Option<String>,

    /// Print the equivalent curl command instead of searching
    #[arg(long)]
    pub curl: bool,
}

#[derive(Debug, clap::Args)]
pub struct ImportArgs {
    pub index: String,

    /// One JSON document per line
    pub file: PathBuf,

    /// Documents per bulk request
    #[arg(long, default_value_t = 1000)]
    pub per_page: u64,
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
