//! Named-entity extraction.
//!
//! Two entry points share one implementation: [`NerExtractor::categorized`]
//! fills the per-article NER columns (persons, organizations, locations,
//! dates, others), and [`NerExtractor::flat_entities`] returns the
//! lowercase union used as a similarity feature by the event grouping
//! engine. The rule pipeline is the primary path; when it cannot be built
//! the extractor degrades to a proper-noun scan at lower confidence, with
//! the same output shape so callers are blind to the choice.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use aho_corasick::{AhoCorasick, MatchKind};
use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::util::text::{hash_text, normalize_whitespace, truncate_chars};

/// Text below this length carries no usable entities.
const MIN_TEXT_CHARS: usize = 50;
/// Input cap before extraction.
const MAX_TEXT_CHARS: usize = 3000;
/// Per-category result cap.
const MAX_ENTITIES_PER_CATEGORY: usize = 10;
const CACHE_CAPACITY: usize = 1000;

const PIPELINE_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Post-filter knobs passed through from the grouping configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityFilter {
    pub min_entity_length: usize,
    pub max_entity_length: usize,
    pub noise_threshold: f64,
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self {
            min_entity_length: 3,
            max_entity_length: 50,
            noise_threshold: 0.200,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedEntities {
    pub persons: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub dates: Vec<String>,
    pub others: Vec<String>,
    pub confidence: f64,
}

impl CategorizedEntities {
    #[must_use]
    pub fn total(&self) -> usize {
        self.persons.len()
            + self.organizations.len()
            + self.locations.len()
            + self.dates.len()
            + self.others.len()
    }
}

/// Boilerplate the ingester leaves behind: bylines, photo credits, social
/// trailers. Removed before extraction so they never surface as entities.
static SCRUB_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)published\s+on.*?$",
        r"(?im)recommended\s+stories.*?$",
        r"(?im)related\s+stories.*?$",
        r"(?im)view\s+\d+\s+comments.*?$",
        r"(?im)read\s+more.*?$",
        r"(?im)click\s+here.*?$",
        r"(?im)share\s+on.*?$",
        r"(?im)photo\s+by.*?$",
        r"(?im)image.*?getty.*?$",
        r"(?im)photograph.*?$",
        r"(?im)(ap|reuters|afp).*?contributed.*?$",
        r"(?im)follow\s+us\s+on.*?$",
        r"(?im)@\w+.*?$",
        r"(?im)#\w+.*?$",
        r"(?im)all\s+rights\s+reserved.*?$",
        r"(?i)\((AP|Reuters|AFP)\)\s*[-—]?\s*",
        r"(?i)breaking\s*:?\s*",
        r"(?i)update\s*:?\s*",
        r"(?i)exclusive\s*:?\s*",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Closed blocklist of capitalized words that are never entities on their
/// own (lowercased for comparison).
static NON_ENTITIES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "this", "that", "these", "those", "there", "here", "when", "where", "what", "who",
        "why", "how", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december", "new", "first", "last", "next", "previous", "other",
        "another", "some", "many", "most", "few", "all", "both", "each", "every", "any", "several",
        "following", "according", "however", "meanwhile", "moreover", "furthermore", "therefore",
        "published", "recommended", "related", "associated", "press", "view", "comments", "share",
        "tweet", "facebook", "instagram", "twitter", "getty", "images", "photo", "picture",
        "video", "audio", "image", "more", "news", "story", "article", "report", "update",
        "breaking", "live", "latest", "today", "yesterday", "tomorrow", "now", "then", "soon",
        "later", "before", "after", "during", "while", "since", "until", "through", "from", "for",
        "at", "in", "on", "by", "with", "without", "about", "against", "between", "among",
        "above", "below", "up", "down", "out", "off", "over", "under", "again", "further", "once",
        "said", "told", "including", "but", "and", "or",
    ]
    .into_iter()
    .collect()
});

static INVALID_PERSONS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "who", "said", "told", "according", "press", "news", "report", "breaking", "update",
        "exclusive", "story", "article",
    ]
    .into_iter()
    .collect()
});

static INVALID_ORGS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "who", "said", "told", "but", "and", "the", "from", "with", "including", "according",
        "however", "meanwhile",
    ]
    .into_iter()
    .collect()
});

static INVALID_LOCATIONS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
        "february", "march", "april", "may", "june", "july", "august", "september", "october",
        "november", "december", "today", "yesterday", "tomorrow", "now", "then", "white", "house",
    ]
    .into_iter()
    .collect()
});

const KNOWN_ORGS: &[&str] = &[
    "Associated Press",
    "Reuters",
    "CNN",
    "BBC",
    "Fox News",
    "ABC News",
    "NBC News",
    "CBS News",
    "Sky News",
    "New York Times",
    "Washington Post",
    "Wall Street Journal",
    "Catholic Church",
    "White House",
    "State Department",
    "Department of Defense",
    "Supreme Court",
    "Congress",
    "Senate",
    "House of Representatives",
    "United Nations",
    "European Union",
    "NATO",
    "World Health Organization",
    "International Monetary Fund",
];

const KNOWN_LOCATIONS: &[&str] = &[
    "Washington",
    "Washington DC",
    "London",
    "Paris",
    "Berlin",
    "Tokyo",
    "Beijing",
    "Moscow",
    "Rome",
    "Madrid",
    "Amsterdam",
    "Brussels",
    "Geneva",
    "Vienna",
    "Dublin",
    "Stockholm",
    "Copenhagen",
    "Oslo",
    "Helsinki",
    "Warsaw",
    "Prague",
    "Budapest",
    "Athens",
    "Lisbon",
    "Cairo",
    "Tel Aviv",
    "Dubai",
    "Mumbai",
    "Delhi",
    "Bangkok",
    "Jakarta",
    "Manila",
    "Seoul",
    "Taipei",
    "Hong Kong",
    "Singapore",
    "Sydney",
    "Melbourne",
    "Toronto",
    "Vancouver",
    "Montreal",
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Philadelphia",
    "Boston",
    "Seattle",
    "Denver",
    "Miami",
    "Atlanta",
    "Detroit",
    "Pittsburgh",
    "Pennsylvania",
    "California",
    "Texas",
    "Kyiv",
    "Ukraine",
    "Israel",
    "Gaza",
];

struct RulePipeline {
    person_titled: Regex,
    person_speech: Regex,
    org_suffixed: Regex,
    org_acronym: Regex,
    org_known: AhoCorasick,
    location_known: AhoCorasick,
    location_in: Regex,
    date_full: Regex,
    date_numeric: Regex,
    date_iso: Regex,
    date_weekday: Regex,
}

impl RulePipeline {
    fn build() -> anyhow::Result<Self> {
        Ok(Self {
            person_titled: Regex::new(
                r"\b(?:President|Prime Minister|Minister|Chancellor|Senator|Governor|CEO|Director|Pope|Doctor|Dr\.?|Mr\.?|Mrs\.?|Ms\.?)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b",
            )?,
            person_speech: Regex::new(
                r"\b([A-Z][a-z]+\s+[A-Z][a-z]+)\s+(?:said|announced|declared|stated|confirmed)\b",
            )?,
            org_suffixed: Regex::new(
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+(?:Corporation|Corp|Company|Co|Inc|Ltd|University|College|Hospital|Department|Ministry|Agency)\b",
            )?,
            org_acronym: Regex::new(r"\b(NATO|EU|UN|FBI|CIA|NSA|WHO|NASA|IMF|WTO)\b")?,
            org_known: AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(KNOWN_ORGS)?,
            location_known: AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(KNOWN_LOCATIONS)?,
            location_in: Regex::new(r"\bin\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b")?,
            date_full: Regex::new(
                r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b",
            )?,
            date_numeric: Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b")?,
            date_iso: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b")?,
            date_weekday: Regex::new(
                r"\b(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\b",
            )?,
        })
    }
}

static PROPER_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b").expect("valid regex"));

#[derive(Clone)]
struct CacheEntry {
    entities: CategorizedEntities,
}

/// Entity extractor with an LRU cache over (title, text, filter).
pub struct NerExtractor {
    pipeline: Option<RulePipeline>,
    cache: Mutex<LruCache<u64, CacheEntry>>,
}

impl Default for NerExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl NerExtractor {
    #[must_use]
    pub fn new() -> Self {
        let pipeline = match RulePipeline::build() {
            Ok(pipeline) => Some(pipeline),
            Err(error) => {
                warn!(error = %error, "NER rule pipeline unavailable, using proper-noun fallback");
                None
            }
        };

        Self {
            pipeline,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero cache capacity"),
            )),
        }
    }

    /// Whether the primary rule pipeline is in use (vs. the fallback scan).
    #[must_use]
    pub fn model_available(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Categorized entities for the article NER columns. Empty categories
    /// for missing or sub-50-char text.
    #[must_use]
    pub fn categorized(&self, title: &str, text: &str, filter: &EntityFilter) -> CategorizedEntities {
        if text.trim().len() < MIN_TEXT_CHARS {
            return CategorizedEntities::default();
        }

        let key = cache_key(title, text, filter);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&key) {
                return entry.entities.clone();
            }
        }

        let combined = if title.is_empty() {
            text.to_string()
        } else {
            format!("{title}. {text}")
        };
        let cleaned = scrub(&combined);

        let entities = match &self.pipeline {
            Some(pipeline) => extract_with_pipeline(pipeline, &cleaned, filter),
            None => extract_with_fallback(&cleaned, filter),
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    entities: entities.clone(),
                },
            );
        }

        entities
    }

    /// Flat lowercase entity set for event grouping: persons, orgs,
    /// locations and misc, excluding dates.
    #[must_use]
    pub fn flat_entities(&self, text: &str, filter: &EntityFilter) -> FxHashSet<String> {
        let categorized = self.categorized("", text, filter);

        categorized
            .persons
            .iter()
            .chain(categorized.organizations.iter())
            .chain(categorized.locations.iter())
            .chain(categorized.others.iter())
            .map(|e| e.to_lowercase())
            .collect()
    }
}

fn cache_key(title: &str, text: &str, filter: &EntityFilter) -> u64 {
    let composite = format!(
        "{title}\u{1f}{text}\u{1f}{}\u{1f}{}\u{1f}{:.3}",
        filter.min_entity_length, filter.max_entity_length, filter.noise_threshold
    );
    hash_text(&composite)
}

fn scrub(text: &str) -> String {
    let mut cleaned = truncate_chars(text, MAX_TEXT_CHARS).to_string();
    for pattern in SCRUB_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    normalize_whitespace(&cleaned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Person,
    Org,
    Location,
    Date,
    Misc,
}

fn is_valid_entity(candidate: &str, category: Category, filter: &EntityFilter) -> bool {
    let trimmed = candidate.trim();
    let lower = trimmed.to_lowercase();

    if trimmed.len() < filter.min_entity_length || trimmed.len() > filter.max_entity_length {
        return false;
    }
    if trimmed.contains('\n') || trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if NON_ENTITIES.contains(lower.as_str()) {
        return false;
    }
    // Noise filter: candidates dominated by non-letter characters are
    // leftover markup or number soup.
    let total = trimmed.chars().count();
    let non_letters = trimmed
        .chars()
        .filter(|c| !c.is_alphabetic() && !c.is_whitespace())
        .count();
    if total > 0 && (non_letters as f64 / total as f64) > filter.noise_threshold {
        return false;
    }

    match category {
        Category::Person => !INVALID_PERSONS.contains(lower.as_str()),
        Category::Org => !INVALID_ORGS.contains(lower.as_str()),
        // "White House" is a valid compound even though the single words
        // are blocked.
        Category::Location => {
            lower == "white house" || !INVALID_LOCATIONS.contains(lower.as_str())
        }
        Category::Date | Category::Misc => true,
    }
}

/// Push with case-insensitive dedup and the per-category cap.
fn push_unique(bucket: &mut Vec<String>, seen: &mut FxHashSet<String>, candidate: &str) {
    let lower = candidate.to_lowercase();
    if seen.contains(&lower) || bucket.len() >= MAX_ENTITIES_PER_CATEGORY {
        return;
    }
    seen.insert(lower);
    bucket.push(candidate.trim().to_string());
}

fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before_ok = start == 0
        || text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = end == text.len()
        || text[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}

fn extract_with_pipeline(
    pipeline: &RulePipeline,
    text: &str,
    filter: &EntityFilter,
) -> CategorizedEntities {
    let mut entities = CategorizedEntities {
        confidence: PIPELINE_CONFIDENCE,
        ..CategorizedEntities::default()
    };
    let mut seen_persons = FxHashSet::default();
    let mut seen_orgs = FxHashSet::default();
    let mut seen_locations = FxHashSet::default();
    let mut seen_dates = FxHashSet::default();

    for caps in pipeline.person_titled.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            if is_valid_entity(name.as_str(), Category::Person, filter) {
                push_unique(&mut entities.persons, &mut seen_persons, name.as_str());
            }
        }
    }
    for caps in pipeline.person_speech.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            if is_valid_entity(name.as_str(), Category::Person, filter) {
                push_unique(&mut entities.persons, &mut seen_persons, name.as_str());
            }
        }
    }

    for mat in pipeline.org_known.find_iter(text) {
        if word_bounded(text, mat.start(), mat.end()) {
            let org = KNOWN_ORGS[mat.pattern().as_usize()];
            if is_valid_entity(org, Category::Org, filter) {
                push_unique(&mut entities.organizations, &mut seen_orgs, org);
            }
        }
    }
    for caps in pipeline.org_suffixed.captures_iter(text) {
        if let Some(full) = caps.get(0) {
            if is_valid_entity(full.as_str(), Category::Org, filter) {
                push_unique(&mut entities.organizations, &mut seen_orgs, full.as_str());
            }
        }
    }
    for mat in pipeline.org_acronym.find_iter(text) {
        if is_valid_entity(mat.as_str(), Category::Org, filter) {
            push_unique(&mut entities.organizations, &mut seen_orgs, mat.as_str());
        }
    }

    for mat in pipeline.location_known.find_iter(text) {
        if word_bounded(text, mat.start(), mat.end()) {
            let location = KNOWN_LOCATIONS[mat.pattern().as_usize()];
            if is_valid_entity(location, Category::Location, filter) {
                push_unique(&mut entities.locations, &mut seen_locations, location);
            }
        }
    }
    for caps in pipeline.location_in.captures_iter(text) {
        if let Some(location) = caps.get(1) {
            if is_valid_entity(location.as_str(), Category::Location, filter) {
                push_unique(
                    &mut entities.locations,
                    &mut seen_locations,
                    location.as_str(),
                );
            }
        }
    }

    for regex in [
        &pipeline.date_full,
        &pipeline.date_numeric,
        &pipeline.date_iso,
        &pipeline.date_weekday,
    ] {
        for mat in regex.find_iter(text) {
            push_unique(&mut entities.dates, &mut seen_dates, mat.as_str());
        }
    }

    entities
}

/// Fallback when the rule pipeline is unavailable: every validated proper
/// noun lands in `others`, lowercased, at reduced confidence.
fn extract_with_fallback(text: &str, filter: &EntityFilter) -> CategorizedEntities {
    let mut entities = CategorizedEntities {
        confidence: FALLBACK_CONFIDENCE,
        ..CategorizedEntities::default()
    };
    let mut seen = FxHashSet::default();

    for caps in PROPER_NOUN.captures_iter(text) {
        if let Some(candidate) = caps.get(1) {
            if is_valid_entity(candidate.as_str(), Category::Misc, filter) {
                let lower = candidate.as_str().to_lowercase();
                push_unique(&mut entities.others, &mut seen, &lower);
            }
        }
    }

    entities
}
