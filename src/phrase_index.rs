//! Phrase index search
//!
//! First (cheapest, most precise) strategy in the pipeline: fuzzy-matches
//! the query against every document's `query_phrases` with Jaro-Winkler.
//! The cutoff is deliberately strict so only high-confidence, exact-ish
//! matches win here; anything fuzzier is left for the later strategies.

use crate::knowledge::KnowledgeBase;
use crate::response::ResponseTemplate;
use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;
use tracing::debug;

/// Strict cutoff, tighter than a general-purpose fuzzy default.
pub const STRICT_MATCH_THRESHOLD: f64 = 0.88;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

pub struct PhraseMatcher {
    pub threshold: f64,
}

impl Default for PhraseMatcher {
    fn default() -> Self {
        Self {
            threshold: STRICT_MATCH_THRESHOLD,
        }
    }
}

impl PhraseMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Lowercases, strips punctuation, and collapses whitespace.
    pub fn normalize(&self, s: &str) -> String {
        let stripped: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        WHITESPACE.replace_all(stripped.trim(), " ").to_string()
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        jaro_winkler(&self.normalize(a), &self.normalize(b))
    }

    /// Best-scoring document phrase across the whole index; the matched
    /// document's response is returned untouched.
    pub fn search(&self, kb: &KnowledgeBase, query: &str) -> Option<ResponseTemplate> {
        let normalized_query = self.normalize(query);
        if normalized_query.is_empty() {
            return None;
        }

        let mut best_score = 0.0;
        let mut best: Option<&ResponseTemplate> = None;
        for doc in &kb.search_documents {
            for phrase in &doc.query_phrases {
                let score = jaro_winkler(&normalized_query, &self.normalize(phrase));
                if score > best_score {
                    best_score = score;
                    best = Some(&doc.response);
                }
            }
        }

        if best_score >= self.threshold {
            debug!(score = best_score, "Phrase index match");
            best.cloned()
        } else {
            None
        }
    }
}
