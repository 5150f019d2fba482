//! TF-IDF scoring over inverted-index entries.

use std::collections::HashMap;

use crate::models::{IndexStats, InvertedIndexEntry};

/// Scores documents against analyzed query terms with the smoothed
/// `idf = ln(1 + N/df)` formula.
pub struct TfIdfScorer {
    total_documents: i64,
}

impl TfIdfScorer {
    pub fn new(stats: &IndexStats) -> Self {
        Self {
            total_documents: stats.total_documents,
        }
    }

    /// Accumulates `tf * idf` per document across all query terms that have
    /// an index entry. Deterministic for a fixed query and index state.
    pub fn score(
        &self,
        query_terms: &[String],
        postings: &HashMap<String, InvertedIndexEntry>,
    ) -> HashMap<String, f64> {
        let mut doc_scores = HashMap::new();
        for term in query_terms {
            let Some(entry) = postings.get(term) else {
                continue;
            };
            let idf = self.idf(entry.df);
            for posting in &entry.postings {
                *doc_scores.entry(posting.doc_id.clone()).or_insert(0.0) +=
                    f64::from(posting.tf) * idf;
            }
        }
        doc_scores
    }

    fn idf(&self, df: i64) -> f64 {
        if df == 0 || self.total_documents == 0 {
            return 0.0;
        }
        (1.0 + self.total_documents as f64 / df as f64).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Posting;

    fn entry(term: &str, postings: Vec<Posting>) -> InvertedIndexEntry {
        let df = postings.len() as i64;
        InvertedIndexEntry {
            term: term.to_string(),
            postings,
            df,
        }
    }

    fn posting(doc_id: &str, tf: u32) -> Posting {
        Posting {
            doc_id: doc_id.to_string(),
            tf,
            positions: (0..tf).collect(),
        }
    }

    #[test]
    fn empty_index_scores_zero() {
        let scorer = TfIdfScorer::new(&IndexStats::default());
        let mut postings = HashMap::new();
        postings.insert("rust".to_string(), entry("rust", vec![posting("d1", 3)]));
        let scores = scorer.score(&["rust".to_string()], &postings);
        assert_eq!(scores.get("d1"), Some(&0.0));
    }

    #[test]
    fn higher_tf_scores_higher() {
        let stats = IndexStats {
            total_documents: 10,
            last_indexed_at: 0,
        };
        let scorer = TfIdfScorer::new(&stats);
        let mut postings = HashMap::new();
        postings.insert(
            "rust".to_string(),
            entry("rust", vec![posting("d1", 5), posting("d2", 1)]),
        );
        let scores = scorer.score(&["rust".to_string()], &postings);
        assert!(scores["d1"] > scores["d2"]);
        assert!(scores["d2"] > 0.0);
    }

    #[test]
    fn terms_missing_from_index_are_ignored() {
        let stats = IndexStats {
            total_documents: 2,
            last_indexed_at: 0,
        };
        let scorer = TfIdfScorer::new(&stats);
        let scores = scorer.score(&["absent".to_string()], &HashMap::new());
        assert!(scores.is_empty());
    }

    #[test]
    fn scores_sum_across_query_terms() {
        let stats = IndexStats {
            total_documents: 4,
            last_indexed_at: 0,
        };
        let scorer = TfIdfScorer::new(&stats);
        let mut postings = HashMap::new();
        postings.insert("hello".to_string(), entry("hello", vec![posting("d1", 2)]));
        postings.insert("world".to_string(), entry("world", vec![posting("d1", 1)]));
        let both = scorer.score(&["hello".to_string(), "world".to_string()], &postings);
        let single = scorer.score(&["hello".to_string()], &postings);
        assert!(both["d1"] > single["d1"]);
    }
}
