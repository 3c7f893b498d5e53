//! Entity/time/title rule engine producing event clusters.
//!
//! Iterates a batch in input order; each unused article seeds a candidate
//! event and later unused articles attach when they share enough entities
//! within the configured time window. Only clusters of two or more
//! articles are emitted, so every article belongs to at most one event
//! per batch.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::analysis::ner::NerExtractor;
use crate::grouping::config::GroupingConfig;
use crate::store::models::ArticleRecord;
use crate::util::text::truncate_chars;

/// Body prefix used for entity extraction during grouping.
const GROUPING_BODY_CHARS: usize = 2000;
const EVENT_TITLE_CHARS: usize = 255;
const EVENT_DESCRIPTION_CHARS: usize = 1000;

static TITLE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]{3,}").expect("valid regex"));

/// High-frequency words excluded from title keyword comparison.
static TITLE_STOPWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
        "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
        "two", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "said",
        "says", "will",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroupedEvent {
    pub(crate) article_ids: Vec<i64>,
    pub(crate) title: String,
    pub(crate) description: String,
}

/// Lowercased title keywords of three letters or more, minus stopwords.
#[must_use]
pub(crate) fn title_keywords(title: &str) -> FxHashSet<String> {
    let lower = title.to_lowercase();
    TITLE_WORD
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|w| !TITLE_STOPWORDS.contains(w.as_str()))
        .collect()
}

/// Partition a batch into events of two or more related articles.
#[must_use]
pub(crate) fn group_articles(
    articles: &[ArticleRecord],
    config: &GroupingConfig,
    ner: &NerExtractor,
) -> Vec<GroupedEvent> {
    let filter = config.entity_filter();

    info!(
        articles = articles.len(),
        min_entities = config.min_shared_entities,
        overlap = config.entity_overlap_threshold,
        time_window_hours = config.max_time_diff_hours,
        "grouping articles into events"
    );

    let entities: Vec<FxHashSet<String>> = articles
        .iter()
        .map(|a| ner.flat_entities(truncate_chars(&a.body, GROUPING_BODY_CHARS), &filter))
        .collect();
    let keywords: Vec<FxHashSet<String>> =
        articles.iter().map(|a| title_keywords(&a.title)).collect();

    let mut used = vec![false; articles.len()];
    let mut events = Vec::new();

    for i in 0..articles.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut members = vec![i];

        for j in (i + 1)..articles.len() {
            if used[j] {
                continue;
            }

            if !config.allow_same_outlet && articles[i].outlet_name == articles[j].outlet_name {
                continue;
            }

            if let (Some(a), Some(b)) = (articles[i].published_at, articles[j].published_at) {
                let diff_hours = (a - b).num_seconds().abs() as f64 / 3600.0;
                if diff_hours > f64::from(config.max_time_diff_hours) {
                    continue;
                }
            }

            let shared = entities[i].intersection(&entities[j]).count();
            let smaller = entities[i].len().min(entities[j].len());
            let mut required = f64::from(config.min_shared_entities)
                .max(smaller as f64 * config.entity_overlap_threshold);

            let title_overlap = keywords[i].intersection(&keywords[j]).count();
            if title_overlap as i32 >= config.min_title_keywords {
                let bonus =
                    (title_overlap as f64 * config.title_keyword_bonus).min(required * 0.5);
                required -= bonus;
            } else if config.min_title_keywords > 0 {
                continue;
            }

            if (shared as f64) < required {
                continue;
            }

            used[j] = true;
            members.push(j);
        }

        if members.len() > 1 {
            debug!(members = members.len(), "created event cluster");
            events.push(build_event(articles, &members));
        }
    }

    let grouped: usize = events.iter().map(|e| e.article_ids.len()).sum();
    info!(
        events = events.len(),
        grouped,
        total = articles.len(),
        "grouping complete"
    );

    events
}

/// Title comes from the longest member title; the description joins all
/// member titles, capped.
fn build_event(articles: &[ArticleRecord], members: &[usize]) -> GroupedEvent {
    let primary = members
        .iter()
        .max_by_key(|&&idx| articles[idx].title.len())
        .copied()
        .unwrap_or(members[0]);

    let title = truncate_chars(&articles[primary].title, EVENT_TITLE_CHARS).to_string();

    let joined = members
        .iter()
        .map(|&idx| articles[idx].title.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    let description = truncate_chars(
        &format!("Event grouping {} related articles: {joined}", members.len()),
        EVENT_DESCRIPTION_CHARS,
    )
    .to_string();

    GroupedEvent {
        article_ids: members.iter().map(|&idx| articles[idx].id).collect(),
        title,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 6, 1, hour % 24, 0, 0).unwrap() + chrono::Duration::days(i64::from(hour / 24)))
    }

    fn article(id: i64, outlet: &str, title: &str, body: &str, hour: u32) -> ArticleRecord {
        ArticleRecord {
            id,
            url: format!("https://example.com/{id}"),
            title: title.to_string(),
            outlet_name: outlet.to_string(),
            published_at: at(hour),
            published_parse_failed: false,
            body: body.to_string(),
        }
    }

    const BODY_A: &str = "President Biden signed the infrastructure bill in Pittsburgh on \
        Tuesday. Lawmakers in Congress praised the measure across Pennsylvania, officials said.";
    const BODY_B: &str = "In Pittsburgh, President Biden approved new infrastructure funding. \
        Congress members from Pennsylvania attended the ceremony, according to officials.";
    const BODY_UNRELATED: &str = "The championship match in Madrid drew record crowds as the \
        league confirmed a new broadcast deal with Sky News for the coming season.";

    #[test]
    fn title_keywords_drop_stopwords_and_short_words() {
        let keywords = title_keywords("President signs the new infrastructure bill in Pittsburgh");
        assert!(keywords.contains("president"));
        assert!(keywords.contains("infrastructure"));
        assert!(keywords.contains("pittsburgh"));
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("new"));
        assert!(!keywords.contains("in"));
    }

    #[test]
    fn two_outlets_one_event() {
        let articles = vec![
            article(
                1,
                "Reuters",
                "President signs infrastructure bill in Pittsburgh",
                BODY_A,
                10,
            ),
            article(
                2,
                "BBC News",
                "US president signs Pittsburgh infrastructure bill",
                BODY_B,
                12,
            ),
        ];
        let ner = NerExtractor::new();

        let events = group_articles(&articles, &GroupingConfig::default(), &ner);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].article_ids, vec![1, 2]);
        assert_eq!(
            events[0].title,
            "US president signs Pittsburgh infrastructure bill"
        );
        assert!(events[0].description.starts_with("Event grouping 2 related articles:"));
    }

    #[test]
    fn same_outlet_never_groups_by_default() {
        let articles = vec![
            article(1, "CNN", "President signs infrastructure bill", BODY_A, 10),
            article(2, "CNN", "Infrastructure bill signed in Pittsburgh", BODY_B, 12),
        ];
        let ner = NerExtractor::new();

        let events = group_articles(&articles, &GroupingConfig::default(), &ner);
        assert!(events.is_empty());

        let relaxed = GroupingConfig {
            allow_same_outlet: true,
            ..GroupingConfig::default()
        };
        let events = group_articles(&articles, &relaxed, &ner);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn time_window_excludes_stale_pairs() {
        let articles = vec![
            article(1, "Reuters", "President signs infrastructure bill", BODY_A, 0),
            article(2, "BBC News", "Pittsburgh infrastructure bill signed", BODY_B, 60),
        ];
        let ner = NerExtractor::new();

        let narrow = GroupingConfig {
            max_time_diff_hours: 48,
            ..GroupingConfig::default()
        };
        assert!(group_articles(&articles, &narrow, &ner).is_empty());

        let wide = GroupingConfig {
            max_time_diff_hours: 72,
            ..GroupingConfig::default()
        };
        assert_eq!(group_articles(&articles, &wide, &ner).len(), 1);
    }

    #[test]
    fn unrelated_article_stays_out() {
        let articles = vec![
            article(
                1,
                "Reuters",
                "President signs infrastructure bill in Pittsburgh",
                BODY_A,
                10,
            ),
            article(
                2,
                "BBC News",
                "US president signs Pittsburgh infrastructure bill",
                BODY_B,
                12,
            ),
            article(3, "Sky News World", "Championship final in Madrid", BODY_UNRELATED, 11),
        ];
        let ner = NerExtractor::new();

        let events = group_articles(&articles, &GroupingConfig::default(), &ner);
        assert_eq!(events.len(), 1);
        assert!(!events[0].article_ids.contains(&3));
    }

    #[test]
    fn no_article_appears_in_two_events() {
        let articles = vec![
            article(1, "Reuters", "Infrastructure bill signed", BODY_A, 10),
            article(2, "BBC News", "Pittsburgh bill signed", BODY_B, 11),
            article(3, "The Guardian", "President approves bill", BODY_A, 12),
            article(4, "CNN", "Congress passes measure", BODY_B, 13),
        ];
        let ner = NerExtractor::new();

        let events = group_articles(&articles, &GroupingConfig::default(), &ner);

        let mut seen = std::collections::HashSet::new();
        for event in &events {
            for id in &event.article_ids {
                assert!(seen.insert(*id), "article {id} appeared in two events");
            }
        }
    }

    #[test]
    fn title_keyword_gate_blocks_mismatched_titles() {
        let articles = vec![
            article(1, "Reuters", "Alpha beta gamma", BODY_A, 10),
            article(2, "BBC News", "Delta epsilon zeta", BODY_B, 12),
        ];
        let ner = NerExtractor::new();

        let gated = GroupingConfig {
            min_title_keywords: 2,
            ..GroupingConfig::default()
        };
        assert!(group_articles(&articles, &gated, &ner).is_empty());
    }

    #[test]
    fn missing_published_at_passes_time_check() {
        let mut first = article(1, "Reuters", "Infrastructure bill signed", BODY_A, 10);
        first.published_at = None;
        let articles = vec![
            first,
            article(2, "BBC News", "Pittsburgh bill signed", BODY_B, 12),
        ];
        let ner = NerExtractor::new();

        let events = group_articles(&articles, &GroupingConfig::default(), &ner);
        assert_eq!(events.len(), 1);
    }
}
