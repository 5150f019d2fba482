use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Web,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::File => "file",
            SourceType::Web => "web",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(SourceType::File),
            "web" => Some(SourceType::Web),
            _ => None,
        }
    }
}

/// One indexed document. `url` is the source locator (filesystem path or
/// absolute URL) and is unique; `file_path` is set for file sources only and
/// backs the incremental re-index lookup. Timestamps are unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_type: SourceType,
    pub url: String,
    pub title: String,
    pub content: String,
    pub indexed_at: i64,
    pub modified_at: i64,
    pub file_path: Option<String>,
}

impl Document {
    /// Builds a fresh record with a generated id and `indexed_at = now`.
    /// Re-indexing always goes through a new record, never an in-place edit.
    pub fn new(
        source_type: SourceType,
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        modified_at: i64,
        file_path: Option<String>,
    ) -> Self {
        Self {
            id: new_doc_id(),
            source_type,
            url: url.into(),
            title: title.into(),
            content: content.into(),
            indexed_at: now_millis(),
            modified_at,
            file_path,
        }
    }
}

/// One `(doc_id, tf, positions)` entry under an inverted-index term.
/// `positions` is strictly increasing and `tf == positions.len()`; a posting
/// with `tf == 0` is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: String,
    pub tf: u32,
    pub positions: Vec<u32>,
}

/// Inverted-index record for one stemmed term. `df` counts the distinct
/// documents in `postings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndexEntry {
    pub term: String,
    pub postings: Vec<Posting>,
    pub df: i64,
}

/// Global index statistics, persisted as a singleton record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: i64,
    pub last_indexed_at: i64,
}

/// Opaque hex document id.
pub fn new_doc_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
