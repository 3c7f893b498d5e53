//! Outlet reputation scoring from journalism awards, professional
//! standing and credibility evidence.
//!
//! Lookup order: fresh cache row, else compute from the agency metrics
//! record and write the derived scores back (agency row + cache, one
//! transaction), else fall back to the administered outlet authority
//! scaled onto the 0-100 range, else the default of 30. Read failures
//! degrade down the same chain.

use std::sync::Arc;

use tracing::{info, warn};

use crate::store::dao::Dao;
use crate::store::models::{AgencyMetrics, ReputationScores};

/// Score for outlets with no reputation evidence at all.
pub(crate) const DEFAULT_REPUTATION: i32 = 30;
/// Outlet authority (0-40) is scaled by this factor onto 0-100.
const AUTHORITY_SCALE: f64 = 2.5;

const MAJOR_AWARD_POINTS: i32 = 10;
const MAJOR_AWARDS_CAP: i32 = 40;
const SPECIALIZED_AWARDS_CAP: i32 = 20;

/// Awards & recognition, 0-60: majors at 10 points each capped at 40,
/// specialized awards capped at 20.
#[must_use]
pub(crate) fn awards_score(metrics: &AgencyMetrics) -> i32 {
    let major = ((metrics.pulitzer_awards
        + metrics.murrow_awards
        + metrics.peabody_awards
        + metrics.emmy_awards)
        * MAJOR_AWARD_POINTS)
        .min(MAJOR_AWARDS_CAP);

    let specialized = ((metrics.george_polk_awards + metrics.dupont_awards) * 5
        + (metrics.spj_awards + metrics.other_specialized_awards) * 2)
        .min(SPECIALIZED_AWARDS_CAP);

    major + specialized
}

/// Press-freedom ranking points, 0-10 (unknown ranking scores the middle).
#[must_use]
pub(crate) fn press_freedom_points(ranking: Option<i32>) -> i32 {
    match ranking {
        None => 5,
        Some(r) if r <= 20 => 10,
        Some(r) if r <= 50 => 8,
        Some(r) if r <= 100 => 6,
        Some(r) if r <= 150 => 4,
        Some(_) => 2,
    }
}

/// Professional standing, 0-25: press freedom, industry memberships,
/// editorial independence and fact-checking standards.
#[must_use]
pub(crate) fn professional_standing_score(metrics: &AgencyMetrics) -> i32 {
    let mut score = press_freedom_points(metrics.press_freedom_ranking);

    score += ((metrics.industry_memberships.len() as i32) * 2).min(6);

    let independence = metrics.editorial_independence_rating.unwrap_or(0.0);
    score += ((independence * 0.4) as i32).min(4);

    if metrics.fact_checking_standards {
        score += 5;
    }

    score.min(25)
}

/// Credibility & ethics, 0-15: three points per true flag.
#[must_use]
pub(crate) fn credibility_score(metrics: &AgencyMetrics) -> i32 {
    [
        metrics.correction_policy_exists,
        metrics.retraction_transparency,
        metrics.ownership_transparency,
        metrics.funding_disclosure,
        metrics.ethics_code_public,
    ]
    .iter()
    .filter(|&&flag| flag)
    .count() as i32
        * 3
}

/// All derived sub-scores plus the clamped final score.
#[must_use]
pub(crate) fn compute_scores(metrics: &AgencyMetrics) -> ReputationScores {
    let total_awards_score = awards_score(metrics);
    let professional = professional_standing_score(metrics);
    let credibility = credibility_score(metrics);

    ReputationScores {
        total_awards_score,
        professional_standing_score: professional,
        credibility_score: credibility,
        final_reputation_score: (total_awards_score + professional + credibility).min(100),
    }
}

#[must_use]
pub(crate) fn scale_authority(authority: f64) -> i32 {
    ((authority * AUTHORITY_SCALE).min(100.0)) as i32
}

pub(crate) struct ReputationAnalyzer {
    dao: Arc<Dao>,
}

impl ReputationAnalyzer {
    pub(crate) fn new(dao: Arc<Dao>) -> Self {
        Self { dao }
    }

    /// Reputation score for an outlet, 0-100.
    pub(crate) async fn outlet_reputation(&self, outlet_name: &str) -> i32 {
        match self.dao.cached_reputation_score(outlet_name).await {
            Ok(Some(score)) => return score,
            Ok(None) => {}
            Err(error) => {
                warn!(outlet = outlet_name, error = %error, "reputation cache read failed");
            }
        }

        self.compute_reputation(outlet_name).await
    }

    /// Compute from agency metrics and persist, or fall back.
    async fn compute_reputation(&self, outlet_name: &str) -> i32 {
        let metrics = match self.dao.agency_metrics_for_outlet(outlet_name).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => return self.authority_fallback(outlet_name).await,
            Err(error) => {
                warn!(outlet = outlet_name, error = %error, "agency metrics read failed");
                return self.authority_fallback(outlet_name).await;
            }
        };

        let scores = compute_scores(&metrics);
        if let Err(error) = self.dao.store_reputation(&metrics, scores).await {
            warn!(outlet = outlet_name, error = %error, "failed to persist reputation scores");
        }

        info!(
            outlet = outlet_name,
            score = scores.final_reputation_score,
            awards = scores.total_awards_score,
            professional = scores.professional_standing_score,
            credibility = scores.credibility_score,
            "computed reputation score"
        );

        scores.final_reputation_score
    }

    async fn authority_fallback(&self, outlet_name: &str) -> i32 {
        match self.dao.outlet_authority_score(outlet_name).await {
            Ok(Some(authority)) => scale_authority(authority),
            Ok(None) => DEFAULT_REPUTATION,
            Err(error) => {
                warn!(outlet = outlet_name, error = %error, "authority read failed, using default");
                DEFAULT_REPUTATION
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_metrics() -> AgencyMetrics {
        AgencyMetrics {
            id: 1,
            outlet_name: "Test Wire".to_string(),
            pulitzer_awards: 0,
            murrow_awards: 0,
            peabody_awards: 0,
            emmy_awards: 0,
            george_polk_awards: 0,
            dupont_awards: 0,
            spj_awards: 0,
            other_specialized_awards: 0,
            press_freedom_ranking: None,
            industry_memberships: Vec::new(),
            editorial_independence_rating: None,
            fact_checking_standards: false,
            correction_policy_exists: false,
            retraction_transparency: false,
            ownership_transparency: false,
            funding_disclosure: false,
            ethics_code_public: false,
        }
    }

    #[test]
    fn major_awards_cap_at_forty() {
        let metrics = AgencyMetrics {
            pulitzer_awards: 3,
            murrow_awards: 2,
            peabody_awards: 1,
            ..bare_metrics()
        };
        assert_eq!(awards_score(&metrics), 40);
    }

    #[test]
    fn specialized_awards_cap_at_twenty() {
        let metrics = AgencyMetrics {
            george_polk_awards: 3,
            dupont_awards: 2,
            spj_awards: 4,
            ..bare_metrics()
        };
        assert_eq!(awards_score(&metrics), 20);
    }

    #[test]
    fn press_freedom_bands() {
        assert_eq!(press_freedom_points(None), 5);
        assert_eq!(press_freedom_points(Some(10)), 10);
        assert_eq!(press_freedom_points(Some(40)), 8);
        assert_eq!(press_freedom_points(Some(90)), 6);
        assert_eq!(press_freedom_points(Some(140)), 4);
        assert_eq!(press_freedom_points(Some(170)), 2);
    }

    #[test]
    fn professional_standing_combines_components() {
        let metrics = AgencyMetrics {
            press_freedom_ranking: Some(15),
            industry_memberships: vec!["WAN-IFRA".into(), "ONA".into(), "INMA".into(), "RTDNA".into()],
            editorial_independence_rating: Some(9.0),
            fact_checking_standards: true,
            ..bare_metrics()
        };
        // 10 press freedom + 6 memberships (capped) + 3 independence + 5 fact-checking
        assert_eq!(professional_standing_score(&metrics), 24);
    }

    #[test]
    fn credibility_counts_three_per_flag() {
        let metrics = AgencyMetrics {
            correction_policy_exists: true,
            retraction_transparency: true,
            ownership_transparency: true,
            funding_disclosure: true,
            ethics_code_public: true,
            ..bare_metrics()
        };
        assert_eq!(credibility_score(&metrics), 15);
    }

    #[test]
    fn final_score_clamps_at_one_hundred() {
        let metrics = AgencyMetrics {
            pulitzer_awards: 10,
            george_polk_awards: 10,
            press_freedom_ranking: Some(1),
            industry_memberships: vec!["a".into(), "b".into(), "c".into()],
            editorial_independence_rating: Some(10.0),
            fact_checking_standards: true,
            correction_policy_exists: true,
            retraction_transparency: true,
            ownership_transparency: true,
            funding_disclosure: true,
            ethics_code_public: true,
            ..bare_metrics()
        };
        let scores = compute_scores(&metrics);
        assert_eq!(scores.final_reputation_score, 100);
    }

    #[test]
    fn adding_a_pulitzer_never_decreases_reputation() {
        for base in [bare_metrics(), AgencyMetrics {
            pulitzer_awards: 2,
            murrow_awards: 2,
            fact_checking_standards: true,
            ..bare_metrics()
        }] {
            let with_award = AgencyMetrics {
                pulitzer_awards: base.pulitzer_awards + 1,
                industry_memberships: base.industry_memberships.clone(),
                ..base.clone()
            };
            assert!(
                compute_scores(&with_award).final_reputation_score
                    >= compute_scores(&base).final_reputation_score
            );
        }
    }

    #[test]
    fn authority_scales_onto_reputation_range() {
        assert_eq!(scale_authority(20.0), 50);
        assert_eq!(scale_authority(40.0), 100);
        assert_eq!(scale_authority(50.0), 100);
        assert_eq!(scale_authority(0.0), 0);
    }
}
