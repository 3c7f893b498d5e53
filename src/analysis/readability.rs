//! Flesch readability metrics with rule-based syllable estimation.

use crate::util::text::{split_sentences, split_words};

/// Estimate syllables in a word: vowel groups, minus a silent trailing
/// "e", with a floor of one.
#[must_use]
pub fn estimate_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');

    let mut count = 0usize;
    let mut previous_was_vowel = false;
    for c in lower.chars() {
        let vowel = is_vowel(c);
        if vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = vowel;
    }

    if lower.ends_with('e') && !lower.ends_with("le") && count > 1 {
        count -= 1;
    }

    count.max(1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadabilityStats {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
}

/// Compute both Flesch metrics in one pass. Empty text yields the neutral
/// midpoint (ease 60, grade 10) used by the default scoring profile.
#[must_use]
pub fn analyze(text: &str) -> ReadabilityStats {
    let sentences = split_sentences(text);
    let words = split_words(text);

    if sentences.is_empty() || words.is_empty() {
        return ReadabilityStats {
            sentences: 0,
            words: 0,
            syllables: 0,
            flesch_reading_ease: 60.0,
            flesch_kincaid_grade: 10.0,
        };
    }

    let syllables: usize = words.iter().map(|w| estimate_syllables(w)).sum();
    let words_per_sentence = words.len() as f64 / sentences.len() as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;

    let flesch_reading_ease = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    let flesch_kincaid_grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;

    ReadabilityStats {
        sentences: sentences.len(),
        words: words.len(),
        syllables,
        flesch_reading_ease,
        flesch_kincaid_grade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cat", 1)]
    #[case("table", 2)]
    #[case("united", 3)]
    #[case("make", 1)]
    #[case("queue", 1)]
    #[case("a", 1)]
    fn syllable_estimates(#[case] word: &str, #[case] expected: usize) {
        assert_eq!(estimate_syllables(word), expected);
    }

    #[test]
    fn empty_text_yields_neutral_midpoint() {
        let stats = analyze("");
        assert_eq!(stats.words, 0);
        assert!((stats.flesch_reading_ease - 60.0).abs() < f64::EPSILON);
        assert!((stats.flesch_kincaid_grade - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn simple_prose_reads_easier_than_dense_prose() {
        let simple = "The cat sat on the mat. The dog ran to the park. We saw it all.";
        let dense = "Notwithstanding considerable organizational heterogeneity, institutional \
            particularities fundamentally complicate intergovernmental coordination mechanisms \
            characterizing contemporary multilateral negotiations.";

        let simple_stats = analyze(simple);
        let dense_stats = analyze(dense);

        assert!(simple_stats.flesch_reading_ease > dense_stats.flesch_reading_ease);
        assert!(simple_stats.flesch_kincaid_grade < dense_stats.flesch_kincaid_grade);
    }

    #[test]
    fn counts_sentences_and_words() {
        let stats = analyze("One two three. Four five six.");
        assert_eq!(stats.sentences, 2);
        assert_eq!(stats.words, 6);
    }
}
