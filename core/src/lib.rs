pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod ranking;
pub mod search;
pub mod stopwords;
pub mod store;

pub use analysis::{Analyzer, Language};
pub use error::StoreError;
pub use models::{Document, IndexStats, InvertedIndexEntry, Posting, SourceType};
pub use store::SearchStore;
