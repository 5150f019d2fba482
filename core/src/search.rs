//! Query-side search: analyze, look up postings, score, paginate.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::error::StoreError;
use crate::ranking::TfIdfScorer;
use crate::store::SearchStore;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(rename = "docID")]
    pub doc_id: String,
    pub title: String,
    pub url: String,
    #[serde(skip)]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<SearchResult>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl SearchResponse {
    fn empty(page: i64, limit: i64) -> Self {
        Self {
            data: Vec::new(),
            page,
            limit,
            total: 0,
        }
    }
}

/// Interface the HTTP handler depends on, so it can be exercised against a
/// mock in tests.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(
        &self,
        query: &str,
        page: i64,
        limit: i64,
    ) -> Result<SearchResponse, StoreError>;
}

/// Production searcher: the same analyzer configuration as indexing, a
/// TF-IDF scorer, and the shared store.
pub struct SearchEngine {
    analyzer: Arc<Analyzer>,
    store: SearchStore,
}

impl SearchEngine {
    pub fn new(analyzer: Arc<Analyzer>, store: SearchStore) -> Self {
        Self { analyzer, store }
    }
}

#[async_trait]
impl Searcher for SearchEngine {
    async fn search(
        &self,
        query: &str,
        page: i64,
        limit: i64,
    ) -> Result<SearchResponse, StoreError> {
        let query_terms = self.analyzer.analyze(query);
        if query_terms.is_empty() {
            return Ok(SearchResponse::empty(page, limit));
        }

        let postings = self.store.get_postings_for_terms(&query_terms).await?;
        let stats = self.store.get_index_stats().await?;

        let scorer = TfIdfScorer::new(&stats);
        let doc_scores = scorer.score(&query_terms, &postings);

        let doc_ids: Vec<String> = doc_scores.keys().cloned().collect();
        let (documents, total) = self.store.get_documents(&doc_ids, page, limit).await?;

        let mut data: Vec<SearchResult> = documents
            .into_iter()
            .map(|doc| SearchResult {
                score: doc_scores.get(&doc.id).copied().unwrap_or(0.0),
                doc_id: doc.id,
                title: doc.title,
                url: doc.url,
            })
            .collect();
        data.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(SearchResponse {
            data,
            page,
            limit,
            total,
        })
    }
}
