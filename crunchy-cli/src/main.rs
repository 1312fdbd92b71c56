use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use crunchy::{read_config, Context, IndexDefinition, Request, Response};
use futures::TryStreamExt;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, SearchArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crunchy=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = read_config(&cli.config_dir)
        .with_context(|| format!("reading config from {}", cli.config_dir.display()))?;
    let ctx = Context::from_settings(settings).context("creating engine client")?;

    match cli.command {
        Commands::Render(args) => {
            let request = build_request(&ctx, &args)?;
            println!("{}", serde_json::to_string_pretty(&request.render())?);
        }
        Commands::Search(args) => {
            let response = build_request(&ctx, &args)?
                .response()
                .await
                .context("search failed")?;
            print_response(&response)?;
        }
        Commands::Count(args) => {
            let count = build_request(&ctx, &args)?.count().await.context("count failed")?;
            println!("{}", count);
        }
        Commands::Scroll {
            search,
            batch_size,
            keep_alive,
        } => {
            let mut hits = Box::pin(
                build_request(&ctx, &search)?
                    .scroll_batches(batch_size, keep_alive.as_deref())
                    .into_hit_stream(),
            );
            let mut seen = 0u64;
            while let Some(hit) = hits.try_next().await.context("scroll failed")? {
                println!("{}", serde_json::to_string(&hit)?);
                seen += 1;
            }
            tracing::info!(hits = seen, "Scroll finished");
        }
        Commands::Q { indices, query } => {
            let response = ctx
                .search(define_all(&ctx, &indices)?)
                .search_string(&query)
                .await
                .context("query-string search failed")?;
            print_response(&response)?;
        }
    }

    Ok(())
}

fn define_all(ctx: &Context, names: &[String]) -> anyhow::Result<Vec<Arc<IndexDefinition>>> {
    names
        .iter()
        .map(|name| {
            ctx.define(IndexDefinition::builder(name.as_str()))
                .with_context(|| format!("invalid index name `{}`", name))
        })
        .collect()
}

fn build_request(ctx: &Context, args: &SearchArgs) -> anyhow::Result<Request> {
    let mut request = ctx.search(define_all(ctx, &args.indices)?);

    for query in &args.queries {
        request = request.query(query.clone());
    }
    for filter in &args.filters {
        request = request.filter(filter.clone());
    }
    if let Some(order) = &args.order {
        request = request.order(order.clone());
    }
    if let Some(aggs) = &args.aggs {
        request = request.aggregations(aggs.clone());
    }
    if let Some(limit) = args.limit {
        request = request.limit(limit);
    }
    if let Some(offset) = args.offset {
        request = request.offset(offset);
    }
    if let Some(per) = args.per {
        request = request.per(per);
    }
    if let Some(page) = args.page {
        request = request.page(page);
    }

    Ok(request)
}

fn print_response(response: &Response) -> anyhow::Result<()> {
    tracing::info!(
        total = response.total(),
        took = ?response.took(),
        page = response.current_page(),
        pages = response.total_pages(),
        "Search finished"
    );
    for hit in response.hits() {
        println!("{}", serde_json::to_string(hit)?);
    }
    let aggs = response.aggs();
    if !aggs.is_empty() {
        println!("{}", serde_json::to_string_pretty(&aggs)?);
    }
    Ok(())
}
