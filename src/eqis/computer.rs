//! EQIS sub-score formulas and the per-event computer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info};

use crate::config::{EqisParams, EqisWeights};
use crate::eqis::tfidf;
use crate::store::dao::Dao;
use crate::store::models::{EventArticleRow, EventClaimRow, EventMetricsRow};

const COHERENCE_MAX_FEATURES: usize = 5000;
/// Persistence saturates at two weeks of distinct publication days.
const PERSISTENCE_SATURATION_DAYS: f64 = 14.0;

/// Per-outlet profile used by coverage, best-source and correction-risk.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutletProfile {
    pub(crate) authority_weight: f64,
    pub(crate) correction_rate: f64,
    pub(crate) group: String,
}

/// Authority weight assumed for outlets with no administered profile.
const DEFAULT_AUTHORITY_WEIGHT: f64 = 0.8;

fn normalized_outlet(outlet_name: &str) -> String {
    let mut lower = outlet_name.to_lowercase();
    for prefix in ["www.", "m.", "mobile."] {
        if let Some(stripped) = lower.strip_prefix(prefix) {
            lower = stripped.to_string();
        }
    }
    lower
}

fn profile_of<'a>(
    profiles: &'a HashMap<String, OutletProfile>,
    outlet_name: &str,
) -> Option<&'a OutletProfile> {
    profiles.get(&normalized_outlet(outlet_name))
}

/// Days sub-score plus (age in days, distinct publication days): a
/// recency decay on the latest article blended with a log persistence
/// term over unique days.
#[must_use]
pub(crate) fn score_days(
    articles: &[EventArticleRow],
    params: &EqisParams,
    now: DateTime<Utc>,
) -> (f64, f64, usize) {
    let published: Vec<DateTime<Utc>> = articles.iter().filter_map(|a| a.published_at).collect();
    let (Some(first), Some(last)) = (published.iter().min(), published.iter().max()) else {
        return (0.0, 0.0, 0);
    };

    let age_days = (now - *first).num_seconds() as f64 / 86_400.0;
    let unique_days: std::collections::HashSet<_> =
        published.iter().map(|p| p.date_naive()).collect();
    let unique_days = unique_days.len();

    let staleness_days = ((now - *last).num_seconds() as f64 / 86_400.0).max(0.0);
    let recency = (-staleness_days / params.recency_tau_days).exp();
    let persistence = (1.0 + unique_days as f64).ln() / (1.0 + PERSISTENCE_SATURATION_DAYS).ln();

    let score = 100.0 * (0.6 * recency + 0.4 * persistence);
    (score.clamp(0.0, 100.0), age_days, unique_days)
}

/// Coverage sub-score plus the distinct outlet-group count, saturating at
/// `coverage_saturation` groups.
#[must_use]
pub(crate) fn score_coverage(
    articles: &[EventArticleRow],
    profiles: &HashMap<String, OutletProfile>,
    params: &EqisParams,
) -> (f64, usize) {
    if articles.is_empty() {
        return (0.0, 0);
    }

    let groups: std::collections::HashSet<String> = articles
        .iter()
        .map(|a| {
            profile_of(profiles, &a.outlet_name)
                .map_or_else(|| normalized_outlet(&a.outlet_name), |p| p.group.clone())
        })
        .collect();

    let count = groups.len();
    let score = 100.0 * (count as f64 / params.coverage_saturation).min(1.0);
    (score, count)
}

/// Keyword coherence: mean pairwise TF-IDF cosine over non-empty bodies,
/// scaled to 0-100. Fewer than `coherence_min_articles` texts scores 0.
#[must_use]
pub(crate) fn score_coherence(articles: &[EventArticleRow], params: &EqisParams) -> f64 {
    let texts: Vec<&str> = articles
        .iter()
        .filter_map(|a| a.body.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if texts.len() < params.coherence_min_articles {
        return 0.0;
    }

    100.0 * tfidf::mean_pairwise_cosine(&texts, COHERENCE_MAX_FEATURES)
}

/// Linear-interpolated quartile of sorted timestamps (epoch seconds).
fn first_quartile(sorted: &[i64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = (sorted.len() - 1) as f64 * 0.25;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower] as f64
    } else {
        let fraction = pos - lower as f64;
        sorted[lower] as f64 + (sorted[upper] - sorted[lower]) as f64 * fraction
    }
}

/// Best source: argmax over outlets of
/// `0.6*authority + 0.2*primacy + 0.2*verified_share`, where primacy is
/// the outlet's share of articles in the event's first time-quartile.
/// Returns (outlet, score scaled to 0-100).
#[must_use]
pub(crate) fn score_best_source(
    articles: &[EventArticleRow],
    claims: &[EventClaimRow],
    profiles: &HashMap<String, OutletProfile>,
) -> (String, f64) {
    let published: Vec<i64> = {
        let mut t: Vec<i64> = articles
            .iter()
            .filter_map(|a| a.published_at)
            .map(|p| p.timestamp())
            .collect();
        t.sort_unstable();
        t
    };
    if published.is_empty() {
        return (String::new(), 0.0);
    }
    let quartile_cut = first_quartile(&published);

    let outlet_by_article: HashMap<i64, String> = articles
        .iter()
        .map(|a| (a.id, normalized_outlet(&a.outlet_name)))
        .collect();

    #[derive(Default)]
    struct OutletStats {
        verified: usize,
        total: usize,
        primacy_hits: usize,
        articles: usize,
    }

    let mut per_outlet: HashMap<String, OutletStats> = HashMap::new();
    for claim in claims {
        let Some(outlet) = outlet_by_article.get(&claim.article_id) else {
            continue;
        };
        let stats = per_outlet.entry(outlet.clone()).or_default();
        stats.total += 1;
        if claim.verified_state.eq_ignore_ascii_case("verified") {
            stats.verified += 1;
        }
    }
    for article in articles {
        let outlet = normalized_outlet(&article.outlet_name);
        let stats = per_outlet.entry(outlet).or_default();
        stats.articles += 1;
        if let Some(published_at) = article.published_at {
            if published_at.timestamp() as f64 <= quartile_cut {
                stats.primacy_hits += 1;
            }
        }
    }

    let mut best = (String::new(), -1.0_f64);
    for (outlet, stats) in &per_outlet {
        let authority = profiles
            .get(outlet)
            .map_or(DEFAULT_AUTHORITY_WEIGHT, |p| p.authority_weight);
        let verified_share = stats.verified as f64 / stats.total.max(1) as f64;
        let primacy = stats.primacy_hits as f64 / stats.articles.max(1) as f64;

        let score = 0.6 * authority + 0.2 * primacy + 0.2 * verified_share;
        if score > best.1 {
            best = (outlet.clone(), score);
        }
    }

    (best.0, (best.1.max(0.0) * 100.0).clamp(0.0, 100.0))
}

/// Corroboration sub-score plus (verified share, contradiction rate). An
/// event with no claims scores 0.
#[must_use]
pub(crate) fn score_corroboration(claims: &[EventClaimRow]) -> (f64, f64, f64) {
    if claims.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let total = claims.len() as f64;
    let verified = claims
        .iter()
        .filter(|c| c.verified_state.eq_ignore_ascii_case("verified"))
        .count() as f64;
    let contested = claims
        .iter()
        .filter(|c| c.verified_state.eq_ignore_ascii_case("contested"))
        .count() as f64;

    let ratio = verified / total;
    let contradiction_rate = contested / total;
    let score = 100.0 * ratio * (1.0 - contradiction_rate);
    (score, ratio, contradiction_rate)
}

/// Correction-risk sub-score plus the raw article-share-weighted risk,
/// capped by `high_risk_cap`.
#[must_use]
pub(crate) fn score_correction_risk(
    articles: &[EventArticleRow],
    profiles: &HashMap<String, OutletProfile>,
    params: &EqisParams,
) -> (f64, f64) {
    if articles.is_empty() {
        return (0.0, 0.0);
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for article in articles {
        *counts.entry(normalized_outlet(&article.outlet_name)).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();

    let risk: f64 = counts
        .iter()
        .map(|(outlet, &count)| {
            let rate = profiles
                .get(outlet)
                .map_or(params.default_correction_rate, |p| p.correction_rate);
            count as f64 / total as f64 * rate
        })
        .sum();

    let score = 100.0 * (1.0 - (risk / params.high_risk_cap).min(1.0));
    (score, risk)
}

pub(crate) struct EqisComputer {
    dao: Arc<Dao>,
    weights: EqisWeights,
    params: EqisParams,
}

impl EqisComputer {
    pub(crate) fn new(dao: Arc<Dao>, weights: EqisWeights, params: EqisParams) -> Self {
        Self {
            dao,
            weights,
            params,
        }
    }

    /// Recompute and persist EQIS for every event. Per-event failures are
    /// logged and skipped. Returns the number of events written.
    pub(crate) async fn recompute_all(&self) -> anyhow::Result<usize> {
        let event_ids = self.dao.list_event_ids().await?;
        if event_ids.is_empty() {
            info!("no events to score");
            return Ok(0);
        }

        let profiles = self.load_profiles().await?;

        let mut written = 0usize;
        for event_id in event_ids {
            match self.recompute_with_profiles(event_id, &profiles).await {
                Ok(()) => written += 1,
                Err(err) => error!(event_id, error = %err, "failed to compute event metrics"),
            }
        }

        info!(events = written, "EQIS recompute complete");
        Ok(written)
    }

    pub(crate) async fn recompute_event(&self, event_id: i64) -> anyhow::Result<()> {
        let profiles = self.load_profiles().await?;
        self.recompute_with_profiles(event_id, &profiles).await
    }

    async fn load_profiles(&self) -> anyhow::Result<HashMap<String, OutletProfile>> {
        let authorities = self.dao.load_outlet_authorities().await?;
        Ok(authorities
            .into_iter()
            .map(|(outlet, authority)| {
                let profile = OutletProfile {
                    authority_weight: authority / 100.0,
                    correction_rate: self.params.default_correction_rate,
                    group: outlet.clone(),
                };
                (outlet, profile)
            })
            .collect())
    }

    async fn recompute_with_profiles(
        &self,
        event_id: i64,
        profiles: &HashMap<String, OutletProfile>,
    ) -> anyhow::Result<()> {
        let articles = self.dao.event_articles(event_id).await?;
        let claims = self.dao.event_claims(event_id).await?;

        let row = compute_event_metrics(
            event_id,
            &articles,
            &claims,
            profiles,
            &self.weights,
            &self.params,
            Utc::now(),
        );
        self.dao.upsert_event_metrics(&row).await?;

        info!(
            event_id,
            eqis = row.eqis_score,
            coverage_sites = row.coverage_sites,
            best_source = %row.best_source,
            "event metrics persisted"
        );
        Ok(())
    }
}

/// Assemble the full EQIS row for one event.
#[must_use]
pub(crate) fn compute_event_metrics(
    event_id: i64,
    articles: &[EventArticleRow],
    claims: &[EventClaimRow],
    profiles: &HashMap<String, OutletProfile>,
    weights: &EqisWeights,
    params: &EqisParams,
    now: DateTime<Utc>,
) -> EventMetricsRow {
    let (days_score, age_days, _unique_days) = score_days(articles, params, now);
    let (coverage_score, site_count) = score_coverage(articles, profiles, params);
    let coherence_score = score_coherence(articles, params);
    let (best_source, best_source_score) = score_best_source(articles, claims, profiles);
    let (corroboration_score, corroboration_ratio, contradiction_rate) =
        score_corroboration(claims);
    let (correction_risk_score, raw_risk) = score_correction_risk(articles, profiles, params);

    let eqis_score = (weights.days * days_score
        + weights.coverage * coverage_score
        + weights.coherence * coherence_score
        + weights.best_source * best_source_score
        + weights.corroboration * corroboration_score
        + weights.correction_risk * correction_risk_score)
        .clamp(0.0, 100.0);

    EventMetricsRow {
        event_id,
        age_days,
        coverage_sites: site_count as i32,
        keyword_coherence: coherence_score,
        best_source,
        corroboration_ratio,
        contradiction_rate,
        correction_risk: raw_risk,
        eqis_score,
        components: json!({
            "days": days_score,
            "coverage": coverage_score,
            "coherence": coherence_score,
            "best_source": best_source_score,
            "corroboration": corroboration_score,
            "correction_risk": correction_risk_score,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn article(id: i64, outlet: &str, hour: u32, body: &str) -> EventArticleRow {
        EventArticleRow {
            id,
            outlet_name: outlet.to_string(),
            published_at: Some(at(hour)),
            body: Some(body.to_string()),
        }
    }

    fn claim(article_id: i64, state: &str) -> EventClaimRow {
        EventClaimRow {
            article_id,
            verified_state: state.to_string(),
        }
    }

    fn params() -> EqisParams {
        EqisParams::default()
    }

    const BODY_A: &str = "President signed the infrastructure bill in Pittsburgh as Congress \
        approved new funding for Pennsylvania bridges and highways.";
    const BODY_B: &str = "The infrastructure bill signed in Pittsburgh brings Congress funding \
        to Pennsylvania bridges, highways and transit systems.";

    #[test]
    fn days_score_is_zero_without_timestamps() {
        let articles = vec![EventArticleRow {
            id: 1,
            outlet_name: "Reuters".into(),
            published_at: None,
            body: None,
        }];
        let (score, age, unique) = score_days(&articles, &params(), at(12));
        assert!(score.abs() < f64::EPSILON);
        assert!(age.abs() < f64::EPSILON);
        assert_eq!(unique, 0);
    }

    #[test]
    fn fresh_single_day_event_scores_recency_dominated() {
        let articles = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "BBC News", 12, BODY_B),
        ];
        let (score, age, unique) = score_days(&articles, &params(), at(12));

        assert_eq!(unique, 1);
        assert!((age - 2.0 / 24.0).abs() < 1e-9);
        // recency = 1 at zero staleness, persistence = ln(2)/ln(15)
        let expected = 100.0 * (0.6 + 0.4 * (2.0_f64.ln() / 15.0_f64.ln()));
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn coverage_counts_distinct_groups() {
        let articles = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "www.Reuters", 11, BODY_A),
            article(3, "BBC News", 12, BODY_B),
        ];
        let (score, count) = score_coverage(&articles, &HashMap::new(), &params());

        assert_eq!(count, 2);
        assert!((score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_saturates_at_configured_group_count() {
        let articles: Vec<EventArticleRow> = (0..30)
            .map(|i| article(i, &format!("Outlet {i}"), 10, BODY_A))
            .collect();
        let (score, _) = score_coverage(&articles, &HashMap::new(), &params());
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coherence_requires_two_texts() {
        let one = vec![article(1, "Reuters", 10, BODY_A)];
        assert!(score_coherence(&one, &params()).abs() < f64::EPSILON);

        let two = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "BBC News", 12, BODY_B),
        ];
        let score = score_coherence(&two, &params());
        assert!(score > 0.0);
        assert!(score <= 100.0);
    }

    #[test]
    fn corroboration_is_zero_without_claims() {
        let (score, ratio, contradiction) = score_corroboration(&[]);
        assert!(score.abs() < f64::EPSILON);
        assert!(ratio.abs() < f64::EPSILON);
        assert!(contradiction.abs() < f64::EPSILON);
    }

    #[test]
    fn corroboration_discounts_contested_claims() {
        let claims = vec![
            claim(1, "verified"),
            claim(1, "verified"),
            claim(2, "contested"),
            claim(2, "unverified"),
        ];
        let (score, ratio, contradiction) = score_corroboration(&claims);

        assert!((ratio - 0.5).abs() < f64::EPSILON);
        assert!((contradiction - 0.25).abs() < f64::EPSILON);
        assert!((score - 100.0 * 0.5 * 0.75).abs() < 1e-9);
    }

    #[test]
    fn correction_risk_uses_default_rate() {
        let articles = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "BBC News", 12, BODY_B),
        ];
        let (score, risk) = score_correction_risk(&articles, &HashMap::new(), &params());

        assert!((risk - 0.02).abs() < 1e-9);
        assert!((score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn best_source_prefers_verified_primary_outlet() {
        let articles = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "BBC News", 12, BODY_B),
        ];
        let claims = vec![claim(1, "verified"), claim(2, "unverified")];
        let mut profiles = HashMap::new();
        profiles.insert(
            "reuters".to_string(),
            OutletProfile {
                authority_weight: 0.4,
                correction_rate: 0.02,
                group: "reuters".to_string(),
            },
        );
        profiles.insert(
            "bbc news".to_string(),
            OutletProfile {
                authority_weight: 0.36,
                correction_rate: 0.02,
                group: "bbc news".to_string(),
            },
        );

        let (best, score) = score_best_source(&articles, &claims, &profiles);
        assert_eq!(best, "reuters");
        // 0.6*0.4 + 0.2*1.0 (primacy) + 0.2*1.0 (verified) = 0.64
        assert!((score - 64.0).abs() < 1e-9);
    }

    #[test]
    fn best_source_is_empty_without_timestamps() {
        let articles = vec![EventArticleRow {
            id: 1,
            outlet_name: "Reuters".into(),
            published_at: None,
            body: None,
        }];
        let (best, score) = score_best_source(&articles, &[], &HashMap::new());
        assert!(best.is_empty());
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn two_outlet_event_composes_above_fifty() {
        let articles = vec![
            article(1, "Reuters", 10, BODY_A),
            article(2, "BBC News", 12, BODY_B),
        ];
        let claims = vec![
            claim(1, "verified"),
            claim(1, "verified"),
            claim(2, "verified"),
        ];

        let row = compute_event_metrics(
            7,
            &articles,
            &claims,
            &HashMap::new(),
            &EqisWeights::default(),
            &params(),
            at(12),
        );

        assert_eq!(row.event_id, 7);
        assert!(row.eqis_score > 50.0);
        assert!(row.eqis_score <= 100.0);
        assert_eq!(row.coverage_sites, 2);
        assert!(row.keyword_coherence > 0.0);
        assert!(["reuters", "bbc news"].contains(&row.best_source.as_str()));
        let components = row.components.as_object().unwrap();
        for key in [
            "days",
            "coverage",
            "coherence",
            "best_source",
            "corroboration",
            "correction_risk",
        ] {
            let value = components.get(key).and_then(serde_json::Value::as_f64).unwrap();
            assert!((0.0..=100.0).contains(&value), "{key} out of range: {value}");
        }
    }
}
