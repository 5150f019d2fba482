//! Concurrent indexing pipeline.
//!
//! `index_directory` is a producer → workers → writer dataflow over bounded
//! channels. The producer walks the tree, workers analyze files (skipping
//! unchanged ones and replacing re-indexed ones), and a single writer batches
//! storage writes. A shared cancellation token propagates the first fatal
//! error to every stage; per-file errors are logged and skipped.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use quarry_core::analysis::Analyzer;
use quarry_core::models::{now_millis, Document, Posting, SourceType};
use quarry_core::store::{SearchStore, TermUpsert};

use crate::html;

const CHANNEL_BUFFER: usize = 100;
const BATCH_SIZE: usize = 100;
const BATCH_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_WEB_CONTENT_CHARS: usize = 100;

/// What a worker hands the writer for one document.
struct IndexPayload {
    doc: Document,
    freqs: HashMap<String, u32>,
    positions: HashMap<String, Vec<u32>>,
}

#[derive(Clone)]
pub struct Indexer {
    analyzer: Arc<Analyzer>,
    store: SearchStore,
}

impl Indexer {
    pub fn new(analyzer: Arc<Analyzer>, store: SearchStore) -> Self {
        Self { analyzer, store }
    }

    /// Indexes every `.txt`/`.md` file under `root`. Returns the first fatal
    /// error (walk failure or batch-write failure); per-file problems only
    /// log. On success, prints the list of indexed paths.
    pub async fn index_directory(&self, root: &Path) -> Result<()> {
        let token = CancellationToken::new();
        let (jobs_tx, jobs_rx) = mpsc::channel::<PathBuf>(CHANNEL_BUFFER);
        let (results_tx, results_rx) = mpsc::channel::<IndexPayload>(CHANNEL_BUFFER);
        let (paths_tx, mut paths_rx) = mpsc::channel::<String>(CHANNEL_BUFFER);
        let (err_tx, mut err_rx) = mpsc::channel::<anyhow::Error>(1);

        // Producer: walk the tree, feeding the jobs channel. Sends race the
        // cancellation token; dropping jobs_tx on return closes the channel.
        let producer = {
            let token = token.clone();
            let err_tx = err_tx.clone();
            let root = root.to_path_buf();
            tokio::spawn(async move {
                for entry in WalkDir::new(&root) {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(err) => {
                            report_error(&err_tx, anyhow!(err).context("directory walk failed"));
                            token.cancel();
                            return;
                        }
                    };
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let ext = entry
                        .path()
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_lowercase());
                    if !matches!(ext.as_deref(), Some("txt" | "md")) {
                        continue;
                    }
                    tokio::select! {
                        sent = jobs_tx.send(entry.into_path()) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                        _ = token.cancelled() => return,
                    }
                }
            })
        };

        // Workers share the jobs receiver; each analyzed file becomes a
        // payload for the writer plus an entry on the audit channel.
        let jobs_rx = Arc::new(tokio::sync::Mutex::new(jobs_rx));
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let indexer = self.clone();
            let jobs_rx = jobs_rx.clone();
            let results_tx = results_tx.clone();
            let paths_tx = paths_tx.clone();
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                indexer.worker(jobs_rx, results_tx, paths_tx, token).await;
            }));
        }
        drop(results_tx);
        drop(paths_tx);

        let writer = {
            let store = self.store.clone();
            let err_tx = err_tx.clone();
            let token = token.clone();
            tokio::spawn(async move {
                run_writer(store, results_rx, err_tx, token).await;
            })
        };

        // Drain the audit channel concurrently so workers never stall on it.
        let collector = tokio::spawn(async move {
            let mut paths = Vec::new();
            while let Some(path) = paths_rx.recv().await {
                paths.push(path);
            }
            paths
        });

        producer.await.context("producer task panicked")?;
        for worker in workers {
            worker.await.context("worker task panicked")?;
        }

        // All result senders are gone now; the writer flushes its final
        // batch and exits, unless cancellation got there first.
        tokio::select! {
            res = writer => res.context("writer task panicked")?,
            _ = token.cancelled() => {}
        }
        let indexed = collector.await.context("collector task panicked")?;

        match err_rx.try_recv() {
            Ok(err) => Err(err.context("indexing failed")),
            Err(_) => {
                println!("Successfully indexed {} files:", indexed.len());
                for path in &indexed {
                    println!("- {path}");
                }
                Ok(())
            }
        }
    }

    /// Indexes one crawled page: visible text is extracted from the HTML,
    /// rejected when shorter than 100 characters, then written through the
    /// same batch path as file indexing.
    pub async fn index_web_page(&self, url: &str, title: &str, html: &str) -> Result<()> {
        let text = html::extract_visible_text(html);
        if text.chars().count() < MIN_WEB_CONTENT_CHARS {
            return Err(anyhow!("content too short to index: {url}"));
        }

        let tokens = self.analyzer.analyze(&text);
        let (freqs, positions) = term_stats(&tokens);
        let doc = Document::new(
            SourceType::Web,
            url,
            title.trim(),
            text,
            now_millis(),
            None,
        );
        let payload = IndexPayload {
            doc,
            freqs,
            positions,
        };

        write_batch(&self.store, std::slice::from_ref(&payload)).await?;
        if let Err(err) = self.store.update_index_stats(1).await {
            tracing::warn!(error = %err, "failed to update index stats");
        }
        Ok(())
    }

    async fn worker(
        &self,
        jobs_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<PathBuf>>>,
        results_tx: mpsc::Sender<IndexPayload>,
        paths_tx: mpsc::Sender<String>,
        token: CancellationToken,
    ) {
        loop {
            let job = {
                let mut rx = jobs_rx.lock().await;
                tokio::select! {
                    job = rx.recv() => job,
                    _ = token.cancelled() => None,
                }
            };
            let Some(path) = job else { return };

            let payload = match self.process_file(&path).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "failed to process file");
                    continue;
                }
            };

            tokio::select! {
                sent = results_tx.send(payload) => {
                    if sent.is_err() {
                        return;
                    }
                }
                _ = token.cancelled() => return,
            }
            tokio::select! {
                sent = paths_tx.send(path.display().to_string()) => {
                    if sent.is_err() {
                        return;
                    }
                }
                _ = token.cancelled() => return,
            }
        }
    }

    /// Reads and analyzes one file. `Ok(None)` means the file is already
    /// indexed and unchanged. A modified file has its old postings removed
    /// and its old record deleted before the fresh payload is built.
    async fn process_file(&self, path: &Path) -> Result<Option<IndexPayload>> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("error reading file {}", path.display()))?;
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("error getting file info for {}", path.display()))?;
        let modified_at = system_time_millis(
            metadata
                .modified()
                .with_context(|| format!("no modification time for {}", path.display()))?,
        );

        let file_path = path.to_string_lossy().into_owned();
        if let Some(existing) = self.store.get_document_by_path(&file_path).await? {
            if modified_at <= existing.modified_at {
                tracing::info!(path = %file_path, "skipping unchanged file");
                return Ok(None);
            }
            // Re-index: the old token stream tells us which terms to clean.
            let old_terms = self.analyzer.analyze(&existing.content);
            self.store
                .remove_postings_for_document(&existing.id, &old_terms)
                .await?;
            self.store.delete_document(&existing.id).await?;
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let title = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_path.clone())
            });

        let tokens = self.analyzer.analyze(&text);
        let (freqs, positions) = term_stats(&tokens);
        let doc = Document::new(
            SourceType::File,
            file_path.clone(),
            title,
            text,
            modified_at,
            Some(file_path),
        );
        Ok(Some(IndexPayload {
            doc,
            freqs,
            positions,
        }))
    }
}

/// Single-pass term statistics over the emitted token stream. Positions are
/// indices into that stream, so `tf == positions.len()` by construction.
fn term_stats(tokens: &[String]) -> (HashMap<String, u32>, HashMap<String, Vec<u32>>) {
    let mut freqs: HashMap<String, u32> = HashMap::new();
    let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        *freqs.entry(token.clone()).or_insert(0) += 1;
        positions.entry(token.clone()).or_default().push(i as u32);
    }
    (freqs, positions)
}

async fn run_writer(
    store: SearchStore,
    mut results_rx: mpsc::Receiver<IndexPayload>,
    err_tx: mpsc::Sender<anyhow::Error>,
    token: CancellationToken,
) {
    let mut batch: Vec<IndexPayload> = Vec::with_capacity(BATCH_SIZE);
    let start = tokio::time::Instant::now() + BATCH_TIMEOUT;
    let mut ticker = tokio::time::interval_at(start, BATCH_TIMEOUT);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            payload = results_rx.recv() => match payload {
                Some(payload) => {
                    batch.push(payload);
                    if batch.len() >= BATCH_SIZE {
                        if !flush(&store, &mut batch, &err_tx, &token).await {
                            return;
                        }
                        ticker.reset();
                    }
                }
                None => {
                    flush(&store, &mut batch, &err_tx, &token).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                if !flush(&store, &mut batch, &err_tx, &token).await {
                    return;
                }
            }
        }
    }
}

/// Writes the batch out; on failure reports the error and cancels the
/// pipeline. A stats-update failure only warns: the index itself is correct.
async fn flush(
    store: &SearchStore,
    batch: &mut Vec<IndexPayload>,
    err_tx: &mpsc::Sender<anyhow::Error>,
    token: &CancellationToken,
) -> bool {
    if batch.is_empty() {
        return true;
    }
    match write_batch(store, batch).await {
        Ok(()) => {
            if let Err(err) = store.update_index_stats(batch.len() as i64).await {
                tracing::warn!(error = %err, "failed to update index stats");
            }
            batch.clear();
            true
        }
        Err(err) => {
            report_error(err_tx, err);
            token.cancel();
            false
        }
    }
}

async fn write_batch(store: &SearchStore, batch: &[IndexPayload]) -> Result<()> {
    let docs: Vec<Document> = batch.iter().map(|p| p.doc.clone()).collect();
    let mut term_models = Vec::with_capacity(batch.len() * 20);
    for payload in batch {
        for (term, freq) in &payload.freqs {
            let positions = payload.positions.get(term).cloned().unwrap_or_default();
            term_models.push(TermUpsert {
                term: term.clone(),
                posting: Posting {
                    doc_id: payload.doc.id.clone(),
                    tf: *freq,
                    positions,
                },
            });
        }
    }

    store
        .bulk_write_documents(&docs)
        .await
        .context("failed to bulk write documents")?;
    store
        .bulk_write_inverted_index(&term_models)
        .await
        .context("failed to bulk write inverted index")?;

    tracing::info!(count = batch.len(), "indexed batch");
    Ok(())
}

/// First error wins; the send never blocks and later errors are dropped.
fn report_error(err_tx: &mpsc::Sender<anyhow::Error>, err: anyhow::Error) {
    let _ = err_tx.try_send(err);
}

fn system_time_millis(t: SystemTime) -> i64 {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(_) => 0,
    }
}
