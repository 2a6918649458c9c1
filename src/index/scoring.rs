//! Lexical relevance scoring used by the SQLite index.

use std::collections::{HashMap, HashSet};

use super::Passage;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "their", "this", "to", "was", "what", "which",
    "with", "about", "any", "how", "me", "tell",
];

/// Lowercased alphanumeric terms of `text`, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Rank `(source, text)` candidates against `query` and keep the best `top_k`.
///
/// Scores are a saturated term frequency weighted by inverse document
/// frequency over the candidate set. Candidates sharing no term with the
/// query are dropped. Ties keep candidate order.
pub fn rank_passages(query: &str, candidates: Vec<(String, String)>, top_k: usize) -> Vec<Passage> {
    let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
    if query_terms.is_empty() || candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let term_counts: Vec<HashMap<String, usize>> = candidates
        .iter()
        .map(|(_, text)| {
            let mut counts = HashMap::new();
            for term in tokenize(text) {
                *counts.entry(term).or_insert(0) += 1;
            }
            counts
        })
        .collect();

    let total = candidates.len() as f64;
    let idf: HashMap<&str, f64> = query_terms
        .iter()
        .map(|term| {
            let df = term_counts.iter().filter(|c| c.contains_key(term)).count() as f64;
            (term.as_str(), (1.0 + (total - df + 0.5) / (df + 0.5)).ln())
        })
        .collect();

    let mut scored: Vec<(usize, f64)> = term_counts
        .iter()
        .enumerate()
        .map(|(idx, counts)| {
            let score = query_terms
                .iter()
                .filter_map(|term| {
                    counts.get(term).map(|&tf| {
                        let tf = tf as f64;
                        tf / (tf + 1.2) * idf[term.as_str()]
                    })
                })
                .sum::<f64>();
            (idx, score)
        })
        .filter(|(_, score)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);

    let mut candidates: Vec<Option<(String, String)>> = candidates.into_iter().map(Some).collect();
    scored
        .into_iter()
        .filter_map(|(idx, score)| {
            candidates[idx]
                .take()
                .map(|(source, text)| Passage::new(source, text, score))
        })
        .collect()
}
