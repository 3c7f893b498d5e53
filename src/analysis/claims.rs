//! Claim extraction and heuristic verification.
//!
//! Produces a bounded set of typed claim sentences from an article. The
//! verification label is heuristic (outlet trust + hedging cues), never
//! ground truth; EQIS consumes it as a bounded signal only.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::analysis::sentiment;
use crate::store::models::{ClaimType, VerifiedState};
use crate::util::text::{normalize_whitespace, split_sentences, truncate_chars};

const MAX_INPUT_CHARS: usize = 100_000;
const MIN_SENTENCE_CHARS: usize = 30;
const MAX_SENTENCE_CHARS: usize = 500;
const MAX_CLAIMS_PER_ARTICLE: usize = 20;
const DEDUP_PREFIX_CHARS: usize = 100;

const NUMERIC_CONFIDENCE: f64 = 0.9;
const INDICATOR_CONFIDENCE: f64 = 0.8;

/// Attribution and evidential phrases that flag a sentence as a claim.
const INDICATOR_PHRASES: &[&str] = &[
    "according to",
    "studies show",
    "research indicates",
    "data suggests",
    "statistics reveal",
    "surveys found",
    "reports indicate",
    "analysis shows",
    "evidence suggests",
    "experts say",
    "officials confirmed",
    "sources claim",
    "it is estimated",
    "increased by",
    "decreased by",
    "rose to",
    "fell to",
];

static INDICATOR_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(INDICATOR_PHRASES)
        .expect("indicator matcher builds")
});

static NUMERIC_INDICATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)approximately\s+\d+|\d+\s*percent|\d+\s*%").expect("valid regex"));

/// Sentences quoting large magnitudes are kept as facts even without an
/// attribution phrase.
static MAGNITUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+[\d,]*\.?\d*\s*(?:percent\b|%|million\b|billion\b|thousand\b)")
        .expect("valid regex")
});

static PREDICTION_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["will", "could", "might", "expected", "forecast", "predict", "future", "likely"]
        .into_iter()
        .collect()
});

static OPINION_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["believe", "think", "feel", "seems", "appears", "arguably", "perhaps", "maybe"]
        .into_iter()
        .collect()
});

static EVIDENCE_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["data", "study", "research", "report", "confirmed"]
        .into_iter()
        .collect()
});

static HEDGING_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["allegedly", "reportedly", "claimed", "accused"]
        .into_iter()
        .collect()
});

static DISPUTED_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["controversial", "disputed", "debate", "conflicting"]
        .into_iter()
        .collect()
});

/// Outlets whose unhedged claims get the benefit of the doubt.
const TRUSTED_OUTLETS: &[&str] = &["Reuters", "Associated Press", "AP News", "BBC News"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractedClaim {
    pub(crate) text: String,
    pub(crate) claim_type: ClaimType,
    pub(crate) verified_state: VerifiedState,
    pub(crate) verification_source: Option<String>,
    pub(crate) confidence: f64,
}

fn words_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn contains_any(text: &str, set: &FxHashSet<&'static str>) -> bool {
    words_of(text).any(|w| set.contains(w.as_str()))
}

/// Classify a claim sentence: prediction markers win, then subjective
/// language, then anything with digits or evidential vocabulary is a fact.
#[must_use]
pub(crate) fn classify_claim(text: &str) -> ClaimType {
    if contains_any(text, &PREDICTION_WORDS) {
        return ClaimType::Prediction;
    }
    if contains_any(text, &OPINION_WORDS) || sentiment::estimate(text).subjectivity > 0.5 {
        return ClaimType::Opinion;
    }
    if text.chars().any(|c| c.is_ascii_digit()) || contains_any(text, &EVIDENCE_WORDS) {
        return ClaimType::Fact;
    }
    ClaimType::Fact
}

/// Heuristic verification label for a claim from a given outlet.
#[must_use]
pub(crate) fn verify_claim(text: &str, outlet_name: &str) -> (VerifiedState, Option<String>) {
    let hedged = contains_any(text, &HEDGING_WORDS);

    if TRUSTED_OUTLETS.contains(&outlet_name) {
        if hedged {
            return (VerifiedState::Unverified, None);
        }
        return (VerifiedState::Verified, Some(outlet_name.to_string()));
    }

    if hedged {
        return (VerifiedState::Unverified, None);
    }
    if contains_any(text, &DISPUTED_WORDS) {
        return (VerifiedState::Contested, None);
    }

    (VerifiedState::Unverified, None)
}

/// Extract the top claims from an article. Returns an empty list when no
/// sentence qualifies; callers persist a placeholder row in that case.
#[must_use]
pub(crate) fn extract_claims(title: &str, body: &str, outlet_name: &str) -> Vec<ExtractedClaim> {
    if body.is_empty() {
        return Vec::new();
    }

    let combined = format!("{title}\n\n{body}");
    let bounded = truncate_chars(&combined, MAX_INPUT_CHARS);
    let sentences = split_sentences(bounded);

    let mut seen_prefixes: FxHashSet<String> = FxHashSet::default();
    let mut candidates: Vec<(String, f64)> = Vec::new();

    for sentence in &sentences {
        let char_len = sentence.chars().count();
        if !(MIN_SENTENCE_CHARS..=MAX_SENTENCE_CHARS).contains(&char_len) {
            continue;
        }
        let has_phrase = INDICATOR_MATCHER.is_match(sentence.as_str());
        let has_numeric = NUMERIC_INDICATOR.is_match(sentence);
        if !has_phrase && !has_numeric {
            continue;
        }

        let normalized = normalize_whitespace(sentence);
        let prefix: String = normalized
            .to_lowercase()
            .chars()
            .take(DEDUP_PREFIX_CHARS)
            .collect();
        if !seen_prefixes.insert(prefix) {
            continue;
        }

        let confidence = if has_numeric {
            NUMERIC_CONFIDENCE
        } else {
            INDICATOR_CONFIDENCE
        };
        candidates.push((normalized, confidence));
    }

    // Second pass: large-magnitude numeric sentences missed above.
    for sentence in &sentences {
        let char_len = sentence.chars().count();
        if !(MIN_SENTENCE_CHARS..=MAX_SENTENCE_CHARS).contains(&char_len) {
            continue;
        }
        if !MAGNITUDE.is_match(sentence) {
            continue;
        }
        let normalized = normalize_whitespace(sentence);
        let prefix: String = normalized
            .to_lowercase()
            .chars()
            .take(DEDUP_PREFIX_CHARS)
            .collect();
        if !seen_prefixes.insert(prefix) {
            continue;
        }
        candidates.push((normalized, NUMERIC_CONFIDENCE));
    }

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(MAX_CLAIMS_PER_ARTICLE);

    candidates
        .into_iter()
        .map(|(text, confidence)| {
            let claim_type = classify_claim(&text);
            let (verified_state, verification_source) = verify_claim(&text, outlet_name);
            ExtractedClaim {
                text,
                claim_type,
                verified_state,
                verification_source,
                confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_sentences_are_skipped() {
        let short = "Data shows 5%."; // under 30 chars
        let long = format!("According to officials, {}", "x".repeat(600));
        let body = format!("{short} {long}");
        let claims = extract_claims("", &body, "Daily Byte");
        assert!(claims.is_empty());
    }

    #[test]
    fn indicator_sentence_becomes_claim() {
        let body = "According to the health ministry, hospitals admitted more patients this week.";
        let claims = extract_claims("", body, "Daily Byte");
        assert_eq!(claims.len(), 1);
        assert!((claims[0].confidence - INDICATOR_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn numeric_sentences_rank_above_indicator_sentences() {
        let body = "According to the health ministry, hospital capacity remains under review. \
            Unemployment fell by 3 percent over the previous quarter across the region.";
        let claims = extract_claims("", body, "Daily Byte");
        assert_eq!(claims.len(), 2);
        assert!((claims[0].confidence - NUMERIC_CONFIDENCE).abs() < f64::EPSILON);
        assert!(claims[0].text.contains("percent"));
    }

    #[test]
    fn magnitude_pass_catches_unattributed_numbers() {
        let body = "The program cost taxpayers 4.5 billion over the last decade of operation.";
        let claims = extract_claims("", body, "Daily Byte");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Fact);
    }

    #[test]
    fn duplicate_sentences_are_deduplicated_by_prefix() {
        let sentence = "According to the agency, the program reached twelve thousand households.";
        let body = format!("{sentence} {sentence}");
        let claims = extract_claims("", &body, "Daily Byte");
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn claim_cap_is_twenty() {
        let mut body = String::new();
        for i in 0..30 {
            body.push_str(&format!(
                "According to analysts, the index case number {i} moved in region {i} overall. "
            ));
        }
        let claims = extract_claims("", &body, "Daily Byte");
        assert_eq!(claims.len(), MAX_CLAIMS_PER_ARTICLE);
    }

    #[test]
    fn classify_prediction_beats_fact() {
        assert_eq!(
            classify_claim("Officials expect output will rise by 4 percent next year."),
            ClaimType::Prediction
        );
    }

    #[test]
    fn classify_opinion_on_subjective_markers() {
        assert_eq!(
            classify_claim("Analysts believe the policy seems misguided."),
            ClaimType::Opinion
        );
    }

    #[test]
    fn classify_defaults_to_fact() {
        assert_eq!(
            classify_claim("The committee approved the measure after a recorded vote."),
            ClaimType::Fact
        );
    }

    #[test]
    fn trusted_outlet_without_hedging_is_verified() {
        let (state, source) =
            verify_claim("The ministry confirmed 40 percent growth.", "Reuters");
        assert_eq!(state, VerifiedState::Verified);
        assert_eq!(source.as_deref(), Some("Reuters"));
    }

    #[test]
    fn hedged_claim_is_unverified_even_for_trusted_outlet() {
        let (state, source) =
            verify_claim("The minister allegedly approved the deal.", "Reuters");
        assert_eq!(state, VerifiedState::Unverified);
        assert!(source.is_none());
    }

    #[test]
    fn disputed_topic_is_contested() {
        let (state, _) = verify_claim(
            "The controversial ruling drew conflicting reactions.",
            "Daily Byte",
        );
        assert_eq!(state, VerifiedState::Contested);
    }
}
