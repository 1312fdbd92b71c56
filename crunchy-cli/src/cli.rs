use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "crunchy")]
#[command(about = "Compose and run searches against an Elasticsearch-compatible engine")]
pub struct Cli {
    /// Directory holding base.yaml and <CRUNCHY_ENVIRONMENT>.yaml
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the request that would be sent, without sending it
    Render(SearchArgs),
    /// Run a search and print its hits
    Search(SearchArgs),
    /// Print the number of matching documents
    Count(SearchArgs),
    /// Stream every matching hit through a scroll cursor
    Scroll {
        #[command(flatten)]
        search: SearchArgs,
        /// Hits per batch, defaults to scroll_batch_size
        #[arg(long)]
        batch_size: Option<u64>,
        /// Cursor keep-alive such as "1m", defaults to scroll_keep_alive
        #[arg(long)]
        keep_alive: Option<String>,
    },
    /// Run a query-string search such as "name:Moscow"
    Q {
        /// Index to search, repeatable
        #[arg(short, long = "index", required = true)]
        indices: Vec<String>,
        query: String,
    },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Index to search, repeatable
    #[arg(short, long = "index", required = true)]
    pub indices: Vec<String>,
    /// Query fragment as JSON, repeatable (AND-combined)
    #[arg(short, long = "query", value_parser = parse_json)]
    pub queries: Vec<Value>,
    /// Filter fragment as JSON, repeatable
    #[arg(short, long = "filter", value_parser = parse_json)]
    pub filters: Vec<Value>,
    /// Sort clause as JSON, e.g. '{"rating":"desc"}'
    #[arg(long, value_parser = parse_json)]
    pub order: Option<Value>,
    /// Aggregations as JSON
    #[arg(long, value_parser = parse_json)]
    pub aggs: Option<Value>,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub offset: Option<u64>,
    /// 1-based page, sized by --per or default_per_page
    #[arg(long)]
    pub page: Option<u64>,
    #[arg(long)]
    pub per: Option<u64>,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_search_arguments() {
        let cli = Cli::parse_from([
            "crunchy",
            "search",
            "-i",
            "cities",
            "-i",
            "places",
            "-q",
            r#"{"match":{"name":"Moscow"}}"#,
            "--limit",
            "5",
        ]);

        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.indices, vec!["cities", "places"]);
        assert_eq!(args.queries, vec![json!({"match": {"name": "Moscow"}})]);
        assert_eq!(args.limit, Some(5));
        assert_eq!(cli.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn rejects_invalid_json() {
        let result = Cli::try_parse_from(["crunchy", "count", "-i", "cities", "-q", "{nope"]);
        assert!(result.is_err());
    }
}
