/// Failure modes of the storage layer and everything built on it. The HTTP
/// handler maps any of these to a 500; pipelines decide per call site
/// whether a failure is fatal to the run (batch writes) or per-item.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored inverted-index row held postings JSON we cannot decode.
    #[error("corrupt postings for term {term:?}: {source}")]
    CorruptPostings {
        term: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt document record {id:?}: {detail}")]
    CorruptDocument { id: String, detail: String },

    #[error("failed to encode posting: {0}")]
    EncodePosting(#[source] serde_json::Error),
}
