//! Small TF-IDF vectorizer for coherence scoring.
//!
//! Mirrors the common smooth-idf formulation: raw term counts scaled by
//! `ln((1+n)/(1+df)) + 1`, l2-normalized rows, cosine similarity as the
//! dot product of normalized vectors. Vocabulary is capped to the highest
//! total-count terms.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

/// Compact English stopword list applied before vectorizing.
static STOPWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself",
        "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once",
        "only", "or", "other", "our", "ours", "out", "over", "own", "said", "same", "she",
        "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "then",
        "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "would", "you", "your", "yours",
    ]
    .into_iter()
    .collect()
});

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// TF-IDF vectors for a corpus, vocabulary capped at `max_features`.
#[must_use]
pub fn vectorize(texts: &[&str], max_features: usize) -> Vec<FxHashMap<usize, f64>> {
    let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();

    // Total counts decide which terms survive the feature cap.
    let mut totals: FxHashMap<&str, usize> = FxHashMap::default();
    for doc in &tokenized {
        for term in doc {
            *totals.entry(term.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(max_features);

    let vocabulary: FxHashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(idx, (term, _))| (*term, idx))
        .collect();

    // Document frequencies over the capped vocabulary.
    let mut df = vec![0usize; vocabulary.len()];
    for doc in &tokenized {
        let mut seen = FxHashSet::default();
        for term in doc {
            if let Some(&idx) = vocabulary.get(term.as_str()) {
                if seen.insert(idx) {
                    df[idx] += 1;
                }
            }
        }
    }

    let n = texts.len() as f64;
    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect();

    tokenized
        .iter()
        .map(|doc| {
            let mut counts: FxHashMap<usize, f64> = FxHashMap::default();
            for term in doc {
                if let Some(&idx) = vocabulary.get(term.as_str()) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
            for (idx, value) in &mut counts {
                *value *= idf[*idx];
            }
            let norm = counts.values().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for value in counts.values_mut() {
                    *value /= norm;
                }
            }
            counts
        })
        .collect()
}

fn cosine(a: &FxHashMap<usize, f64>, b: &FxHashMap<usize, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(idx, value)| large.get(idx).map(|other| value * other))
        .sum()
}

/// Mean pairwise cosine similarity across the corpus, in [0, 1]. Fewer
/// than two documents yields 0.
#[must_use]
pub fn mean_pairwise_cosine(texts: &[&str], max_features: usize) -> f64 {
    if texts.len() < 2 {
        return 0.0;
    }

    let vectors = vectorize(texts, max_features);
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            sum += cosine(&vectors[i], &vectors[j]);
            pairs += 1;
        }
    }

    if pairs == 0 { 0.0 } else { sum / pairs as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_documents_have_unit_similarity() {
        let text = "the parliament approved the budget amendment for rural infrastructure";
        let similarity = mean_pairwise_cosine(&[text, text], 5000);
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_documents_have_zero_similarity() {
        let similarity = mean_pairwise_cosine(
            &[
                "quantum processors entangle qubits rapidly",
                "marathon runners crossed finish lines downtown",
            ],
            5000,
        );
        assert!(similarity.abs() < 1e-9);
    }

    #[test]
    fn related_documents_land_between_extremes() {
        let similarity = mean_pairwise_cosine(
            &[
                "parliament approved budget amendment infrastructure spending",
                "parliament debated budget amendment before approving spending",
                "weather forecast predicts heavy rainfall across coastal towns",
            ],
            5000,
        );
        assert!(similarity > 0.0);
        assert!(similarity < 1.0);
    }

    #[test]
    fn stopwords_do_not_contribute() {
        let similarity = mean_pairwise_cosine(
            &["the and of with from", "the and of with from"],
            5000,
        );
        assert!(similarity.abs() < 1e-9);
    }

    #[test]
    fn single_document_scores_zero() {
        assert!(mean_pairwise_cosine(&["only one document"], 5000).abs() < f64::EPSILON);
    }

    #[test]
    fn feature_cap_limits_vocabulary() {
        let vectors = vectorize(
            &["alpha beta gamma delta epsilon", "alpha beta gamma delta epsilon"],
            2,
        );
        assert!(vectors.iter().all(|v| v.len() <= 2));
    }
}
