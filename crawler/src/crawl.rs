//! Bounded-worker breadth-first crawler.
//!
//! Workers pop `(url, depth)` tasks from a bounded queue. Accepting a task
//! marks the URL visited (check-and-insert under one lock) and bumps an
//! outstanding-task counter; when the counter returns to zero the stored
//! queue sender is dropped, the channel closes, and workers drain out.

use anyhow::{bail, Context, Result};
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use quarry_indexer::Indexer;

use crate::robots::{parse_robots_txt, RobotRules};

pub const DEFAULT_USER_AGENT: &str = "MyCrawler/1.0 (+https://example.com/bot)";
const DEFAULT_WORKER_COUNT: usize = 5;
const QUEUE_CAPACITY: usize = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct CrawlTask {
    url: String,
    depth: u32,
}

#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub title: String,
    pub status: u16,
    pub depth: u32,
    pub allowed: bool,
}

pub struct Crawler {
    shared: Arc<Shared>,
    seeds: Vec<String>,
    worker_count: usize,
    queue_rx: Mutex<Option<mpsc::Receiver<CrawlTask>>>,
}

struct Shared {
    max_depth: u32,
    user_agent: String,
    client: Client,
    indexer: Indexer,
    visited: Mutex<HashSet<String>>,
    rules_cache: RwLock<HashMap<String, Arc<RobotRules>>>,
    last_request: Mutex<HashMap<String, Instant>>,
    results: Mutex<Vec<CrawlResult>>,
    outstanding: AtomicUsize,
    queue_tx: Mutex<Option<mpsc::Sender<CrawlTask>>>,
}

impl Crawler {
    pub fn new(seeds: Vec<String>, max_depth: u32, indexer: Indexer) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                max_depth,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                client,
                indexer,
                visited: Mutex::new(HashSet::new()),
                rules_cache: RwLock::new(HashMap::new()),
                last_request: Mutex::new(HashMap::new()),
                results: Mutex::new(Vec::new()),
                outstanding: AtomicUsize::new(0),
                queue_tx: Mutex::new(Some(queue_tx)),
            }),
            seeds,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_rx: Mutex::new(Some(queue_rx)),
        })
    }

    /// Runs the crawl to completion, prints the summary and returns the
    /// accumulated results.
    pub async fn crawl(&self) -> Vec<CrawlResult> {
        for url in &self.seeds {
            self.shared.enqueue(url.clone(), 0);
        }
        if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
            // Nothing accepted; close the queue so workers exit immediately.
            *self.shared.queue_tx.lock() = None;
        }

        let queue_rx = self
            .queue_rx
            .lock()
            .take()
            .expect("crawl may only run once");
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));

        let mut workers = Vec::with_capacity(self.worker_count);
        for _ in 0..self.worker_count {
            let shared = self.shared.clone();
            let queue_rx = queue_rx.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let task = { queue_rx.lock().await.recv().await };
                    let Some(task) = task else { return };
                    shared.crawl_task(task).await;
                    shared.task_done();
                }
            }));
        }
        for worker in workers {
            let _ = worker.await;
        }

        self.print_results();
        self.shared.results.lock().clone()
    }

    fn print_results(&self) {
        let results = self.shared.results.lock();
        println!("\n=== CRAWL SUMMARY ===");
        for result in results.iter() {
            let status = if !result.allowed {
                "BLOCKED".to_string()
            } else if result.status >= 400 {
                format!("ERROR {}", result.status)
            } else {
                "OK".to_string()
            };
            println!("[{status}] Depth {}: {}", result.depth, result.url);
            if !result.title.is_empty() {
                println!("    Title: {}", result.title);
            }
        }
        println!("Total pages processed: {}", results.len());
    }
}

impl Shared {
    /// The enqueue contract: depth-gated, visited check-and-insert, counted.
    /// A full queue drops the task with a warning rather than blocking the
    /// worker that discovered it.
    fn enqueue(&self, url: String, depth: u32) {
        if depth > self.max_depth {
            return;
        }
        if !self.visited.lock().insert(url.clone()) {
            return;
        }
        let Some(queue_tx) = self.queue_tx.lock().clone() else {
            return;
        };
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = queue_tx.try_send(CrawlTask { url, depth }) {
            tracing::warn!(error = %err, "crawl queue full, dropping link");
            self.task_done();
        }
    }

    fn task_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            *self.queue_tx.lock() = None;
        }
    }

    async fn crawl_task(&self, task: CrawlTask) {
        let url = match Url::parse(&task.url) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(url = %task.url, error = %err, "invalid URL");
                return;
            }
        };
        let Some(host) = url.host_str().map(str::to_string) else {
            tracing::error!(url = %task.url, "URL has no host");
            return;
        };

        let rules = self.robot_rules(&host).await;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        if !rules.is_allowed(&path) {
            tracing::info!(url = %task.url, "blocked by robots.txt");
            self.add_result(CrawlResult {
                url: task.url,
                title: String::new(),
                status: 0,
                depth: task.depth,
                allowed: false,
            });
            return;
        }

        self.respect_crawl_delay(&host, rules.crawl_delay).await;

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(url = %task.url, error = %err, "HTTP error");
                return;
            }
        };
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(url = %task.url, error = %err, "failed to read body");
                return;
            }
        };

        let (title, links) = parse_page(&body, &url, task.depth < self.max_depth);
        tracing::info!(status, depth = task.depth, url = %task.url, "fetched");
        self.add_result(CrawlResult {
            url: task.url.clone(),
            title: title.clone(),
            status,
            depth: task.depth,
            allowed: true,
        });

        if (200..300).contains(&status) {
            if let Err(err) = self.indexer.index_web_page(&task.url, &title, &body).await {
                tracing::error!(url = %task.url, error = %err, "failed to index page");
            }
        }

        for link in links {
            self.enqueue(link, task.depth + 1);
        }
    }

    async fn robot_rules(&self, host: &str) -> Arc<RobotRules> {
        if let Some(rules) = self.rules_cache.read().get(host) {
            return rules.clone();
        }
        let rules = match self.fetch_robots(host).await {
            Ok(text) => Arc::new(parse_robots_txt(&text, &self.user_agent)),
            Err(err) => {
                // Cache a permissive set so a broken host is not re-fetched
                // for every one of its pages.
                tracing::warn!(host, error = %err, "robots.txt unavailable, allowing all");
                Arc::new(RobotRules::permissive(&self.user_agent))
            }
        };
        self.rules_cache
            .write()
            .insert(host.to_string(), rules.clone());
        rules
    }

    async fn fetch_robots(&self, host: &str) -> Result<String> {
        validate_robots_host(host)?;
        let robots_url = format!("https://{host}/robots.txt");
        let response = self.client.get(&robots_url).send().await?;
        if response.status().as_u16() >= 400 {
            bail!("status {}", response.status());
        }
        Ok(response.text().await?)
    }

    async fn respect_crawl_delay(&self, host: &str, delay: f64) {
        if delay <= 0.0 {
            return;
        }
        let wait = self.last_request.lock().get(host).map(|last| {
            Duration::from_secs_f64(delay).saturating_sub(last.elapsed())
        });
        if let Some(wait) = wait {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        self.last_request.lock().insert(host.to_string(), Instant::now());
    }

    fn add_result(&self, result: CrawlResult) {
        self.results.lock().push(result);
    }
}

/// Title plus, when `want_links` is set, every `<a href>` resolved against
/// `base` and scoped to the same host.
fn parse_page(body: &str, base: &Url, want_links: bool) -> (String, Vec<String>) {
    let document = Html::parse_document(body);
    let title_selector = Selector::parse("title").expect("valid selector");
    let anchor_selector = Selector::parse("a[href]").expect("valid selector");

    let title = document
        .select(&title_selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let mut links = Vec::new();
    if want_links {
        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = base.join(href) else {
                continue;
            };
            if absolute.scheme().starts_with("http") && absolute.host_str() == base.host_str() {
                links.push(absolute.to_string());
            }
        }
    }
    (title, links)
}

fn validate_robots_host(host: &str) -> Result<()> {
    if host.is_empty() {
        bail!("empty host");
    }
    if matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]") {
        bail!("refusing loopback host {host}");
    }
    if host.contains('/') || host.contains("://") {
        bail!("invalid host {host:?}");
    }
    Ok(())
}
