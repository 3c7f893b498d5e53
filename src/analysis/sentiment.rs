//! Lexicon-based polarity/subjectivity estimation.
//!
//! A deliberately small estimator used by the claim classifier: sentences
//! whose subjectivity exceeds 0.5 are treated as opinion. The lexicon is a
//! curated set of common evaluative and hedging vocabulary; coverage is
//! intentionally shallow, the claim classifier has stronger signals first.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// (polarity, subjectivity) for a word, both in [-1, 1] / [0, 1].
static LEXICON: Lazy<FxHashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    let entries: &[(&str, f64, f64)] = &[
        // Strongly evaluative
        ("amazing", 0.6, 0.9),
        ("awful", -0.7, 0.9),
        ("best", 0.8, 0.6),
        ("devastating", -0.7, 0.8),
        ("excellent", 0.8, 0.8),
        ("fantastic", 0.8, 0.9),
        ("good", 0.5, 0.6),
        ("great", 0.7, 0.7),
        ("horrible", -0.8, 0.9),
        ("incredible", 0.5, 0.9),
        ("outrageous", -0.6, 0.9),
        ("poor", -0.4, 0.6),
        ("shocking", -0.5, 0.9),
        ("terrible", -0.8, 0.9),
        ("wonderful", 0.8, 0.9),
        ("worst", -0.8, 0.6),
        // Hedged / judgment-laden
        ("apparently", 0.0, 0.7),
        ("arguably", 0.0, 0.8),
        ("beautiful", 0.7, 0.8),
        ("believe", 0.0, 0.7),
        ("certainly", 0.2, 0.6),
        ("clearly", 0.1, 0.6),
        ("controversial", -0.2, 0.7),
        ("feel", 0.0, 0.7),
        ("hopefully", 0.3, 0.8),
        ("important", 0.2, 0.6),
        ("likely", 0.0, 0.6),
        ("maybe", 0.0, 0.7),
        ("obvious", 0.1, 0.7),
        ("perhaps", 0.0, 0.7),
        ("probably", 0.0, 0.6),
        ("seems", 0.0, 0.7),
        ("should", 0.0, 0.6),
        ("significant", 0.2, 0.5),
        ("supposedly", -0.1, 0.8),
        ("surprising", 0.1, 0.7),
        ("think", 0.0, 0.7),
        ("undoubtedly", 0.2, 0.8),
        ("unfortunately", -0.4, 0.8),
        ("wrong", -0.5, 0.7),
    ];
    entries.iter().map(|&(w, p, s)| (w, (p, s))).collect()
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

/// Average the lexicon scores of the words present in the text. Words
/// outside the lexicon count as fully objective.
#[must_use]
pub fn estimate(text: &str) -> Sentiment {
    let mut polarity_sum = 0.0;
    let mut subjectivity_sum = 0.0;
    let mut hits = 0usize;

    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let lower = word.to_lowercase();
        if let Some(&(polarity, subjectivity)) = LEXICON.get(lower.as_str()) {
            polarity_sum += polarity;
            subjectivity_sum += subjectivity;
            hits += 1;
        }
    }

    if hits == 0 {
        return Sentiment {
            polarity: 0.0,
            subjectivity: 0.0,
        };
    }

    Sentiment {
        polarity: polarity_sum / hits as f64,
        subjectivity: subjectivity_sum / hits as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_text_is_objective() {
        let sentiment = estimate("The committee met at noon on Tuesday.");
        assert!(sentiment.subjectivity < 0.5);
        assert!(sentiment.polarity.abs() < f64::EPSILON);
    }

    #[test]
    fn evaluative_text_is_subjective() {
        let sentiment = estimate("This is an amazing and wonderful outcome, clearly the best.");
        assert!(sentiment.subjectivity > 0.5);
        assert!(sentiment.polarity > 0.0);
    }

    #[test]
    fn hedged_text_registers_subjectivity() {
        let sentiment = estimate("It seems the plan will probably work, arguably.");
        assert!(sentiment.subjectivity > 0.5);
    }

    #[test]
    fn empty_text_is_zero() {
        let sentiment = estimate("");
        assert!(sentiment.subjectivity.abs() < f64::EPSILON);
    }
}
