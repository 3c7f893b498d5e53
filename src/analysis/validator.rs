//! Feed-to-agency validation.
//!
//! Joins the active feed list with the agency reputation table and reports
//! per-feed mapping status plus aggregate percentages. Advisory only: it
//! logs warnings at startup and serves the report on demand, but never
//! blocks processing.

use serde::Serialize;
use tracing::{info, warn};

use crate::store::dao::Dao;
use crate::store::error::StoreResult;
use crate::store::models::FeedAgencyRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum ValidationStatus {
    #[serde(rename = "VALID")]
    Valid,
    #[serde(rename = "AGENCY_MAPPED_NO_SCORE")]
    AgencyMappedNoScore,
    #[serde(rename = "NO_AGENCY_MAPPING")]
    NoAgencyMapping,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedValidation {
    pub(crate) feed_id: i64,
    pub(crate) outlet_name: String,
    pub(crate) url: String,
    pub(crate) agency_name: Option<String>,
    pub(crate) reputation_score: Option<i32>,
    pub(crate) status: ValidationStatus,
    pub(crate) recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ValidationSummary {
    pub(crate) total_rss_feeds: usize,
    pub(crate) mapped_to_agencies: usize,
    pub(crate) with_reputation_scores: usize,
    pub(crate) unmapped_feeds: usize,
    pub(crate) mapped_but_unscored: usize,
    pub(crate) mapping_percentage: f64,
    pub(crate) scoring_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MappingSuggestion {
    pub(crate) rss_outlet: String,
    pub(crate) suggested_agency: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ValidationReport {
    pub(crate) summary: ValidationSummary,
    pub(crate) unmapped_feeds: Vec<FeedValidation>,
    pub(crate) mapping_suggestions: Vec<MappingSuggestion>,
}

/// Well-known outlet-name variants used when suggesting mappings for
/// unmapped feeds.
const OUTLET_VARIANTS: &[(&str, &[&str])] = &[
    ("bbc", &["bbc news", "bbc world", "bbc"]),
    ("cnn", &["cnn", "cnn top stories", "cnn.com"]),
    ("reuters", &["reuters", "reuters top news", "reuters.com"]),
    ("associated press", &["ap", "ap news", "associated press"]),
    ("new york times", &["nyt", "nytimes", "new york times"]),
    ("npr", &["npr", "npr news", "national public radio"]),
    ("washington post", &["washington post", "washpost"]),
    ("guardian", &["guardian", "theguardian.com"]),
    ("fox news", &["fox", "fox news", "foxnews.com"]),
];

/// Classify one feed row.
#[must_use]
pub(crate) fn validate_feed(row: &FeedAgencyRow) -> FeedValidation {
    let (status, recommendations) = if row.news_agency_id.is_none() {
        (
            ValidationStatus::NoAgencyMapping,
            vec![
                format!(
                    "Consider adding '{}' to the agency reputation metrics table",
                    row.outlet_name
                ),
                "Feed will use fallback outlet authority scoring".to_string(),
            ],
        )
    } else if row.final_reputation_score.unwrap_or(0) == 0 {
        (
            ValidationStatus::AgencyMappedNoScore,
            vec![
                format!(
                    "Populate reputation data for '{}'",
                    row.agency_name.as_deref().unwrap_or("unknown agency")
                ),
                "Run the reputation analyzer to compute scores".to_string(),
            ],
        )
    } else {
        (ValidationStatus::Valid, Vec::new())
    };

    FeedValidation {
        feed_id: row.feed_id,
        outlet_name: row.outlet_name.clone(),
        url: row.url.clone(),
        agency_name: row.agency_name.clone(),
        reputation_score: row.final_reputation_score,
        status,
        recommendations,
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10000.0).round() / 100.0
}

#[must_use]
pub(crate) fn summarize(validations: &[FeedValidation]) -> ValidationSummary {
    let total = validations.len();
    let mapped = validations
        .iter()
        .filter(|v| v.status != ValidationStatus::NoAgencyMapping)
        .count();
    let scored = validations
        .iter()
        .filter(|v| v.status == ValidationStatus::Valid)
        .count();

    ValidationSummary {
        total_rss_feeds: total,
        mapped_to_agencies: mapped,
        with_reputation_scores: scored,
        unmapped_feeds: total - mapped,
        mapped_but_unscored: mapped - scored,
        mapping_percentage: percentage(mapped, total),
        scoring_percentage: percentage(scored, total),
    }
}

/// Best-effort agency suggestions for unmapped outlets: substring matches
/// against existing agency names, then well-known variants.
#[must_use]
pub(crate) fn suggest_mappings(
    unmapped: &[FeedValidation],
    agencies: &[String],
) -> Vec<MappingSuggestion> {
    let mut suggestions = Vec::new();

    for feed in unmapped {
        let outlet = feed.outlet_name.to_lowercase();

        for agency in agencies {
            let agency_lower = agency.to_lowercase();

            let substring_hit = agency_lower
                .split_whitespace()
                .any(|word| word.len() > 3 && outlet.contains(word));
            let variant_hit = matches_variant(&outlet, &agency_lower);

            if substring_hit || variant_hit {
                suggestions.push(MappingSuggestion {
                    rss_outlet: feed.outlet_name.clone(),
                    suggested_agency: agency.clone(),
                });
                break;
            }
        }
    }

    suggestions
}

fn matches_variant(outlet: &str, agency: &str) -> bool {
    let agency_key = agency.trim_start_matches("the ").trim();
    OUTLET_VARIANTS
        .iter()
        .find(|(key, _)| *key == agency_key)
        .is_some_and(|(_, variants)| variants.iter().any(|variant| outlet.contains(variant)))
}

/// Full validation report over the active feed set.
pub(crate) async fn build_report(dao: &Dao) -> StoreResult<ValidationReport> {
    let rows = dao.feed_agency_rows().await?;
    let validations: Vec<FeedValidation> = rows.iter().map(validate_feed).collect();
    let summary = summarize(&validations);

    let unmapped: Vec<FeedValidation> = validations
        .into_iter()
        .filter(|v| v.status == ValidationStatus::NoAgencyMapping)
        .collect();
    let agencies = dao.agency_names().await?;
    let mapping_suggestions = suggest_mappings(&unmapped, &agencies);

    Ok(ValidationReport {
        summary,
        unmapped_feeds: unmapped,
        mapping_suggestions,
    })
}

/// Log the startup validation summary. Failures only warn; the validator
/// never blocks processing.
pub(crate) async fn log_startup_report(dao: &Dao) {
    match build_report(dao).await {
        Ok(report) => {
            let summary = report.summary;
            info!(
                total = summary.total_rss_feeds,
                mapped = summary.mapped_to_agencies,
                scored = summary.with_reputation_scores,
                mapping_pct = summary.mapping_percentage,
                scoring_pct = summary.scoring_percentage,
                "feed validation summary"
            );
            if summary.unmapped_feeds > 0 {
                warn!(
                    count = summary.unmapped_feeds,
                    "feeds with no agency mapping"
                );
            }
            if summary.mapped_but_unscored > 0 {
                warn!(
                    count = summary.mapped_but_unscored,
                    "feeds mapped to agencies without reputation scores"
                );
            }
        }
        Err(error) => warn!(error = %error, "could not generate feed validation report"),
    }
}

/// Validated reputation path for quality composition: whether the outlet's
/// feed maps to a scored agency, plus the score.
pub(crate) async fn validated_agency_score(
    dao: &Dao,
    outlet_name: &str,
) -> StoreResult<Option<i32>> {
    let Some(row) = dao.feed_agency_for_outlet(outlet_name).await? else {
        return Ok(None);
    };
    if row.news_agency_id.is_none() {
        return Ok(None);
    }
    match row.final_reputation_score {
        Some(score) if score > 0 => Ok(Some(score)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        feed_id: i64,
        outlet: &str,
        agency: Option<&str>,
        score: Option<i32>,
    ) -> FeedAgencyRow {
        FeedAgencyRow {
            feed_id,
            outlet_name: outlet.to_string(),
            url: format!("https://feeds.example.com/{feed_id}"),
            news_agency_id: agency.map(|_| feed_id + 100),
            agency_name: agency.map(str::to_string),
            final_reputation_score: score,
        }
    }

    #[test]
    fn classifies_feed_statuses() {
        assert_eq!(
            validate_feed(&row(1, "Reuters", Some("Reuters"), Some(85))).status,
            ValidationStatus::Valid
        );
        assert_eq!(
            validate_feed(&row(2, "BBC News", Some("BBC"), Some(0))).status,
            ValidationStatus::AgencyMappedNoScore
        );
        assert_eq!(
            validate_feed(&row(3, "BBC News", Some("BBC"), None)).status,
            ValidationStatus::AgencyMappedNoScore
        );
        assert_eq!(
            validate_feed(&row(4, "UnknownWire", None, None)).status,
            ValidationStatus::NoAgencyMapping
        );
    }

    #[test]
    fn unmapped_feeds_carry_recommendations() {
        let validation = validate_feed(&row(4, "UnknownWire", None, None));
        assert!(!validation.recommendations.is_empty());
    }

    #[test]
    fn summary_matches_spec_example() {
        // 10 active feeds, 7 mapped, 5 of those scored.
        let mut validations = Vec::new();
        for i in 0..5 {
            validations.push(validate_feed(&row(i, "Outlet", Some("Agency"), Some(50))));
        }
        for i in 5..7 {
            validations.push(validate_feed(&row(i, "Outlet", Some("Agency"), None)));
        }
        for i in 7..10 {
            validations.push(validate_feed(&row(i, "Outlet", None, None)));
        }

        let summary = summarize(&validations);
        assert_eq!(summary.total_rss_feeds, 10);
        assert_eq!(summary.mapped_to_agencies, 7);
        assert_eq!(summary.with_reputation_scores, 5);
        assert_eq!(summary.unmapped_feeds, 3);
        assert_eq!(summary.mapped_but_unscored, 2);
        assert!((summary.mapping_percentage - 70.0).abs() < f64::EPSILON);
        assert!((summary.scoring_percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_of_empty_feed_set_is_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_rss_feeds, 0);
        assert!(summary.mapping_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        let mut validations = Vec::new();
        validations.push(validate_feed(&row(0, "Outlet", Some("Agency"), Some(50))));
        for i in 1..3 {
            validations.push(validate_feed(&row(i, "Outlet", None, None)));
        }
        let summary = summarize(&validations);
        assert!((summary.mapping_percentage - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn suggestions_use_substring_matching() {
        let unmapped = vec![validate_feed(&row(1, "Reuters Top News", None, None))];
        let agencies = vec!["Reuters".to_string(), "BBC".to_string()];

        let suggestions = suggest_mappings(&unmapped, &agencies);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_agency, "Reuters");
    }

    #[test]
    fn suggestions_use_known_variants() {
        let unmapped = vec![validate_feed(&row(1, "NYT", None, None))];
        let agencies = vec!["The New York Times".to_string()];

        let suggestions = suggest_mappings(&unmapped, &agencies);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_agency, "The New York Times");
    }

    #[test]
    fn unrelated_outlets_get_no_suggestion() {
        let unmapped = vec![validate_feed(&row(1, "Obscure Regional Blog", None, None))];
        let agencies = vec!["Reuters".to_string()];

        assert!(suggest_mappings(&unmapped, &agencies).is_empty());
    }
}
