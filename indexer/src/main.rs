use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use quarry_core::analysis::Analyzer;
use quarry_core::store::SearchStore;
use quarry_indexer::Indexer;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index text and markdown files into the search database", long_about = None)]
struct Cli {
    /// Directory to index (overrides indexer.path from config.yaml)
    #[arg(long)]
    path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let cfg = quarry_core::config::load().context("failed to load configuration")?;
    let store = SearchStore::connect(&cfg.database_url)
        .await
        .context("failed to connect to storage")?;

    let analyzer = Arc::new(Analyzer::from_env());
    let indexer = Indexer::new(analyzer, store);

    let root = cli.path.unwrap_or(cfg.indexer.path);
    indexer.index_directory(Path::new(&root)).await?;
    println!("Indexing completed OK");
    Ok(())
}
