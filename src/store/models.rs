use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Claim classification produced by the claim extractor. `None` marks an
/// article that was processed but yielded no real claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClaimType {
    Fact,
    Opinion,
    Prediction,
    None,
}

impl ClaimType {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ClaimType::Fact => "fact",
            ClaimType::Opinion => "opinion",
            ClaimType::Prediction => "prediction",
            ClaimType::None => "none",
        }
    }
}

/// Heuristic verification label. Downstream scoring treats this as a
/// signal, never as ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerifiedState {
    Verified,
    Contested,
    Unverified,
}

impl VerifiedState {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            VerifiedState::Verified => "verified",
            VerifiedState::Contested => "contested",
            VerifiedState::Unverified => "unverified",
        }
    }
}

/// Provenance of a configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigSource {
    Startup,
    Runtime,
    Manual,
    AutoTune,
}

impl ConfigSource {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ConfigSource::Startup => "startup",
            ConfigSource::Runtime => "runtime",
            ConfigSource::Manual => "manual",
            ConfigSource::AutoTune => "auto_tune",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CleanupStatus {
    Running,
    Completed,
    Error,
}

impl CleanupStatus {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CleanupStatus::Running => "running",
            CleanupStatus::Completed => "completed",
            CleanupStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PressFreedomTier {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl PressFreedomTier {
    /// Tier from a world press-freedom ranking.
    #[must_use]
    pub(crate) fn from_ranking(ranking: Option<i32>) -> Self {
        match ranking {
            None => PressFreedomTier::Unknown,
            Some(r) if r <= 20 => PressFreedomTier::Excellent,
            Some(r) if r <= 50 => PressFreedomTier::Good,
            Some(r) if r <= 100 => PressFreedomTier::Fair,
            Some(_) => PressFreedomTier::Poor,
        }
    }

    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            PressFreedomTier::Excellent => "excellent",
            PressFreedomTier::Good => "good",
            PressFreedomTier::Fair => "fair",
            PressFreedomTier::Poor => "poor",
            PressFreedomTier::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScoreTrend {
    Initial,
    Stable,
    Improving,
    Declining,
}

impl ScoreTrend {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ScoreTrend::Initial => "initial",
            ScoreTrend::Stable => "stable",
            ScoreTrend::Improving => "improving",
            ScoreTrend::Declining => "declining",
        }
    }
}

/// An RSS/Atom feed row. `outlet_name` is the sole join key for
/// outlet-scoped data across the system.
#[derive(Debug, Clone)]
pub(crate) struct Feed {
    pub(crate) id: i64,
    pub(crate) url: String,
    pub(crate) outlet_name: String,
    pub(crate) last_fetched: Option<DateTime<Utc>>,
    pub(crate) poll_interval_minutes: Option<i32>,
}

/// Fields written when an article is first ingested.
#[derive(Debug, Clone)]
pub(crate) struct NewArticle {
    pub(crate) url: String,
    pub(crate) outlet_name: String,
    pub(crate) title: String,
    pub(crate) author: Option<String>,
    pub(crate) published_at: Option<DateTime<Utc>>,
    /// The source carried a publish date the extractor could not parse.
    pub(crate) published_parse_failed: bool,
    pub(crate) body: Option<String>,
    pub(crate) raw_html: Option<String>,
    pub(crate) feed_id: i64,
}

/// Subset of an article used by the composition worker and the grouping
/// engine.
#[derive(Debug, Clone)]
pub(crate) struct ArticleRecord {
    pub(crate) id: i64,
    pub(crate) url: String,
    pub(crate) title: String,
    pub(crate) outlet_name: String,
    pub(crate) published_at: Option<DateTime<Utc>>,
    pub(crate) published_parse_failed: bool,
    pub(crate) body: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewClaim {
    pub(crate) article_id: i64,
    pub(crate) claim_text: String,
    pub(crate) claim_type: ClaimType,
    pub(crate) verified_state: VerifiedState,
    pub(crate) verification_source: Option<String>,
    pub(crate) confidence: f64,
}

/// Article row joined through an event's membership links, as consumed by
/// the EQIS computer.
#[derive(Debug, Clone)]
pub(crate) struct EventArticleRow {
    pub(crate) id: i64,
    pub(crate) outlet_name: String,
    pub(crate) published_at: Option<DateTime<Utc>>,
    pub(crate) body: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EventClaimRow {
    pub(crate) article_id: i64,
    pub(crate) verified_state: String,
}

/// One EQIS row per event; replaced wholesale on recompute.
#[derive(Debug, Clone)]
pub(crate) struct EventMetricsRow {
    pub(crate) event_id: i64,
    pub(crate) age_days: f64,
    pub(crate) coverage_sites: i32,
    pub(crate) keyword_coherence: f64,
    pub(crate) best_source: String,
    pub(crate) corroboration_ratio: f64,
    pub(crate) contradiction_rate: f64,
    pub(crate) correction_risk: f64,
    pub(crate) eqis_score: f64,
    pub(crate) components: Value,
}

/// Administered reputation evidence for one news agency, plus the derived
/// scores written back by the reputation analyzer.
#[derive(Debug, Clone)]
pub(crate) struct AgencyMetrics {
    pub(crate) id: i64,
    pub(crate) outlet_name: String,
    pub(crate) pulitzer_awards: i32,
    pub(crate) murrow_awards: i32,
    pub(crate) peabody_awards: i32,
    pub(crate) emmy_awards: i32,
    pub(crate) george_polk_awards: i32,
    pub(crate) dupont_awards: i32,
    pub(crate) spj_awards: i32,
    pub(crate) other_specialized_awards: i32,
    pub(crate) press_freedom_ranking: Option<i32>,
    pub(crate) industry_memberships: Vec<String>,
    pub(crate) editorial_independence_rating: Option<f64>,
    pub(crate) fact_checking_standards: bool,
    pub(crate) correction_policy_exists: bool,
    pub(crate) retraction_transparency: bool,
    pub(crate) ownership_transparency: bool,
    pub(crate) funding_disclosure: bool,
    pub(crate) ethics_code_public: bool,
}

/// Derived reputation sub-scores written back into the agency row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReputationScores {
    pub(crate) total_awards_score: i32,
    pub(crate) professional_standing_score: i32,
    pub(crate) credibility_score: i32,
    pub(crate) final_reputation_score: i32,
}

/// Active feed joined with its agency reputation record, used by the
/// feed-to-agency validator and the validated reputation path.
#[derive(Debug, Clone)]
pub(crate) struct FeedAgencyRow {
    pub(crate) feed_id: i64,
    pub(crate) outlet_name: String,
    pub(crate) url: String,
    pub(crate) news_agency_id: Option<i64>,
    pub(crate) agency_name: Option<String>,
    pub(crate) final_reputation_score: Option<i32>,
}

/// Grouping parameters and score as loaded back from a stored snapshot.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotRow {
    pub(crate) min_shared_entities: i32,
    pub(crate) entity_overlap_threshold: f64,
    pub(crate) min_title_keywords: i32,
    pub(crate) title_keyword_bonus: f64,
    pub(crate) max_time_diff_hours: i32,
    pub(crate) allow_same_outlet: bool,
    pub(crate) min_entity_length: i32,
    pub(crate) max_entity_length: i32,
    pub(crate) entity_noise_threshold: f64,
    pub(crate) performance_score: Option<f64>,
    pub(crate) config_generation: i32,
}

/// Audit-log entry for a grouping parameter change or suggestion.
#[derive(Debug, Clone)]
pub(crate) struct NewConfigChangeEvent {
    pub(crate) parameter_name: String,
    pub(crate) old_value: String,
    pub(crate) new_value: String,
    pub(crate) change_reason: String,
    pub(crate) previous_score: Option<f64>,
    pub(crate) target_improvement: Option<String>,
    pub(crate) config_snapshot_id: Option<i64>,
    pub(crate) triggered_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_freedom_tier_bands() {
        assert_eq!(
            PressFreedomTier::from_ranking(None),
            PressFreedomTier::Unknown
        );
        assert_eq!(
            PressFreedomTier::from_ranking(Some(5)),
            PressFreedomTier::Excellent
        );
        assert_eq!(
            PressFreedomTier::from_ranking(Some(20)),
            PressFreedomTier::Excellent
        );
        assert_eq!(
            PressFreedomTier::from_ranking(Some(50)),
            PressFreedomTier::Good
        );
        assert_eq!(
            PressFreedomTier::from_ranking(Some(100)),
            PressFreedomTier::Fair
        );
        assert_eq!(
            PressFreedomTier::from_ranking(Some(151)),
            PressFreedomTier::Poor
        );
    }

    #[test]
    fn enum_labels_match_store_values() {
        assert_eq!(ClaimType::Fact.as_str(), "fact");
        assert_eq!(ClaimType::None.as_str(), "none");
        assert_eq!(VerifiedState::Contested.as_str(), "contested");
        assert_eq!(ConfigSource::AutoTune.as_str(), "auto_tune");
        assert_eq!(CleanupStatus::Error.as_str(), "error");
        assert_eq!(ScoreTrend::Improving.as_str(), "improving");
    }
}
