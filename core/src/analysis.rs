use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

use crate::stopwords;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\p{L}+").expect("valid regex");
}

/// Languages the analyzer can stem. Selected with `ANALYZER_LANGUAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    fn algorithm(self) -> Algorithm {
        match self {
            Language::English => Algorithm::English,
            Language::Spanish => Algorithm::Spanish,
        }
    }

    /// Reads `ANALYZER_LANGUAGE`; anything other than `spanish` falls back
    /// to English.
    pub fn from_env() -> Self {
        match std::env::var("ANALYZER_LANGUAGE") {
            Ok(v) if v.eq_ignore_ascii_case("spanish") => Language::Spanish,
            _ => Language::English,
        }
    }
}

/// Turns raw text into the normalized, stemmed, stopword-free token stream
/// used by both indexing and querying. Indexing and query analysis must go
/// through the same instance configuration or recall collapses.
///
/// Immutable after construction and safe to share across tasks.
pub struct Analyzer {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
}

impl Analyzer {
    pub fn new(stopwords: &[&str], language: Language) -> Self {
        Self {
            stopwords: stopwords.iter().map(|w| w.to_lowercase()).collect(),
            stemmer: Stemmer::create(language.algorithm()),
        }
    }

    pub fn english() -> Self {
        Self::new(stopwords::ENGLISH, Language::English)
    }

    pub fn spanish() -> Self {
        Self::new(stopwords::SPANISH, Language::Spanish)
    }

    pub fn from_env() -> Self {
        match Language::from_env() {
            Language::English => Self::english(),
            Language::Spanish => Self::spanish(),
        }
    }

    /// Tokenize, normalize, drop stopwords, stem. Tokens are maximal runs of
    /// Unicode letters; digits, punctuation and hyphens all split. The
    /// output never contains empty strings, and positions in the emitted
    /// sequence are what the index records.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut result = Vec::new();
        for mat in WORD_RE.find_iter(text) {
            let word = normalize(mat.as_str());
            if word.is_empty() {
                continue;
            }
            if self.stopwords.contains(&word) {
                continue;
            }
            result.push(self.stemmer.stem(&word).to_string());
        }
        result
    }
}

fn normalize(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_lowercase_letters_only() {
        let a = Analyzer::new(&[], Language::English);
        for token in a.analyze("Mixed CASE, 123 numbers and hy-phenated!") {
            assert!(!token.is_empty());
            assert!(token.chars().all(|c| c.is_alphabetic() && c.is_lowercase()));
        }
    }

    #[test]
    fn is_deterministic() {
        let a = Analyzer::english();
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(a.analyze(text), a.analyze(text));
    }

    #[test]
    fn hyphens_split_compounds() {
        let a = Analyzer::new(&[], Language::English);
        let tokens = a.analyze("well-known");
        assert_eq!(tokens, vec!["well", "known"]);
    }

    #[test]
    fn language_from_env_defaults_to_english() {
        std::env::remove_var("ANALYZER_LANGUAGE");
        assert_eq!(Language::from_env(), Language::English);
    }
}
