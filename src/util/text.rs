//! Text utilities: sentence/word segmentation, hashing, truncation.

use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

/// Hash text with XXH3. Used as a cache key for analyzer results.
#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Split text into sentences using UAX#29 sentence boundaries.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split text into word tokens (alphanumeric UAX#29 words).
#[must_use]
pub fn split_words(text: &str) -> Vec<&str> {
    text.unicode_words().collect()
}

/// Truncate to at most `max_chars` characters without splitting a char.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapse runs of whitespace into single spaces and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_text_is_deterministic() {
        assert_eq!(hash_text("Hello, world!"), hash_text("Hello, world!"));
        assert_ne!(hash_text("Hello"), hash_text("Goodbye"));
    }

    #[test]
    fn split_sentences_handles_simple_text() {
        let sentences = split_sentences("First sentence. Second sentence! Third sentence?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "First sentence.");
        assert_eq!(sentences[2], "Third sentence?");
    }

    #[test]
    fn split_sentences_filters_empty() {
        let sentences = split_sentences("Sentence one.  \n\n  Sentence two.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn split_words_keeps_alphanumerics() {
        let words = split_words("Officials confirmed 42 cases in Vienna.");
        assert_eq!(words, vec!["Officials", "confirmed", "42", "cases", "in", "Vienna"]);
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 10), "ab");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn normalize_whitespace_collapses_runs() {
        assert_eq!(
            normalize_whitespace("  a\t b \n  c  "),
            "a b c".to_string()
        );
    }
}
