//! Keyword extraction: stop-word filtered unigrams, bigrams, and trigrams
//! stemmed with `rust-stemmers`, the way the teacher leans on stemming for
//! entity normalization rather than raw string matching.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "said", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
];

/// Extracts stemmed unigram/bigram/trigram keywords, ranked by frequency.
pub fn extract_keywords(text: &str, top_n: usize) -> HashSet<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    let tokens: Vec<String> = text
        .unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !stop_words.contains(w.as_str()))
        .map(|w| stemmer.stem(&w).to_string())
        .collect();

    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for window in tokens.windows(1) {
        *counts.entry(window.join(" ")).or_insert(0) += 1;
    }
    for window in tokens.windows(2) {
        *counts.entry(window.join(" ")).or_insert(0) += 1;
    }
    for window in tokens.windows(3) {
        *counts.entry(window.join(" ")).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(top_n).map(|(k, _)| k).collect()
}

/// Jaccard similarity between two keyword sets.
pub fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_are_excluded() {
        let keywords = extract_keywords("the quick brown fox jumps over the lazy dog", 20);
        assert!(!keywords.contains("the"));
        assert!(keywords.iter().any(|k| k.contains("quick") || k.contains("fox")));
    }

    #[test]
    fn identical_text_has_full_overlap() {
        let a = extract_keywords("kubernetes cluster scaling event", 10);
        let b = a.clone();
        assert_eq!(keyword_overlap(&a, &b), 1.0);
    }
}
