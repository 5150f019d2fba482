use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use quarry_core::analysis::Analyzer;
use quarry_core::search::SearchEngine;
use quarry_core::store::SearchStore;
use quarry_server::build_app;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve the search API and UI", long_about = None)]
struct Cli {
    /// Port to bind (overrides server_port from config.yaml)
    #[arg(long)]
    port: Option<u16>,
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
    let searcher = Arc::new(SearchEngine::new(analyzer, store));
    let app = build_app(searcher);

    let port = cli.port.unwrap_or(cfg.server_port);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
