use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

use quarry_core::analysis::Analyzer;
use quarry_core::store::SearchStore;
use quarry_indexer::Indexer;

mod crawl;
mod robots;

use crawl::Crawler;

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Crawl configured seed URLs into the search index, respecting robots.txt", long_about = None)]
struct Cli {
    /// Maximum crawl depth (overrides crawler.max_depth from config.yaml)
    #[arg(long)]
    max_depth: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let start = Instant::now();

    let cfg = quarry_core::config::load().context("failed to load configuration")?;
    let store = SearchStore::connect(&cfg.database_url)
        .await
        .context("failed to connect to storage")?;

    let analyzer = Arc::new(Analyzer::from_env());
    let indexer = Indexer::new(analyzer, store);

    let max_depth = cli.max_depth.unwrap_or(cfg.crawler.max_depth);
    let crawler = Crawler::new(cfg.crawler.urls, max_depth, indexer)?;

    println!("Crawler application started");
    let results = crawler.crawl().await;
    tracing::info!(pages = results.len(), "crawl finished");
    println!("Elapsed: {:.2?}", start.elapsed());
    Ok(())
}
