//! Application configuration: `config.yaml` in the working directory,
//! overridable by environment variables with `.` replaced by `_`
//! (`CRAWLER_MAX_DEPTH` overrides `crawler.max_depth`).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub max_depth: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_index_path")]
    pub path: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_server_port() -> u16 {
    8080
}

fn default_index_path() -> String {
    "data".to_string()
}

/// Loads `./config.yaml` and applies env overrides. A missing or
/// unparseable file is a startup error.
pub fn load() -> Result<AppConfig, ::config::ConfigError> {
    let mut cfg: AppConfig = ::config::Config::builder()
        .add_source(::config::File::new("config.yaml", ::config::FileFormat::Yaml))
        .build()?
        .try_deserialize()?;

    if let Ok(v) = std::env::var("DATABASE_URL") {
        cfg.database_url = v;
    }
    if let Ok(v) = std::env::var("SERVER_PORT") {
        if let Ok(port) = v.parse() {
            cfg.server_port = port;
        }
    }
    if let Ok(v) = std::env::var("CRAWLER_URLS") {
        cfg.crawler.urls = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(v) = std::env::var("CRAWLER_MAX_DEPTH") {
        if let Ok(depth) = v.parse() {
            cfg.crawler.max_depth = depth;
        }
    }
    if let Ok(v) = std::env::var("INDEXER_PATH") {
        cfg.indexer.path = v;
    }

    Ok(cfg)
}
