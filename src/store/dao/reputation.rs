use std::collections::HashMap;

use sqlx::Row;

use super::Dao;
use crate::store::error::StoreResult;
use crate::store::models::{AgencyMetrics, FeedAgencyRow, PressFreedomTier, ReputationScores};

impl Dao {
    /// Administered fallback authority for one outlet (0-40 scale).
    pub(crate) async fn outlet_authority_score(&self, outlet_name: &str) -> StoreResult<Option<f64>> {
        let row = sqlx::query(
            "SELECT authority_score FROM outlet_authority WHERE LOWER(outlet_name) = LOWER($1)",
        )
        .bind(outlet_name)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("authority_score")?)),
            None => Ok(None),
        }
    }

    /// All authority rows, keyed by lowercase outlet name. Used by EQIS to
    /// build outlet profiles in one read.
    pub(crate) async fn load_outlet_authorities(&self) -> StoreResult<HashMap<String, f64>> {
        let rows = sqlx::query("SELECT outlet_name, authority_score FROM outlet_authority")
            .fetch_all(self.pool())
            .await?;

        let mut authorities = HashMap::with_capacity(rows.len());
        for row in rows {
            let outlet: String = row.try_get("outlet_name")?;
            let score: f64 = row.try_get("authority_score")?;
            authorities.insert(outlet.to_lowercase(), score);
        }
        Ok(authorities)
    }

    pub(crate) async fn agency_metrics_for_outlet(
        &self,
        outlet_name: &str,
    ) -> StoreResult<Option<AgencyMetrics>> {
        let row = sqlx::query(
            r"
            SELECT id, outlet_name, pulitzer_awards, murrow_awards, peabody_awards, emmy_awards,
                   george_polk_awards, dupont_awards, spj_awards, other_specialized_awards,
                   press_freedom_ranking, industry_memberships, editorial_independence_rating,
                   fact_checking_standards, correction_policy_exists, retraction_transparency,
                   ownership_transparency, funding_disclosure, ethics_code_public
            FROM news_agency_reputation_metrics
            WHERE LOWER(outlet_name) = LOWER($1)
            ",
        )
        .bind(outlet_name)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(AgencyMetrics {
            id: row.try_get("id")?,
            outlet_name: row.try_get("outlet_name")?,
            pulitzer_awards: row.try_get("pulitzer_awards")?,
            murrow_awards: row.try_get("murrow_awards")?,
            peabody_awards: row.try_get("peabody_awards")?,
            emmy_awards: row.try_get("emmy_awards")?,
            george_polk_awards: row.try_get("george_polk_awards")?,
            dupont_awards: row.try_get("dupont_awards")?,
            spj_awards: row.try_get("spj_awards")?,
            other_specialized_awards: row.try_get("other_specialized_awards")?,
            press_freedom_ranking: row.try_get("press_freedom_ranking")?,
            industry_memberships: row
                .try_get::<Option<Vec<String>>, _>("industry_memberships")?
                .unwrap_or_default(),
            editorial_independence_rating: row.try_get("editorial_independence_rating")?,
            fact_checking_standards: row.try_get("fact_checking_standards")?,
            correction_policy_exists: row.try_get("correction_policy_exists")?,
            retraction_transparency: row.try_get("retraction_transparency")?,
            ownership_transparency: row.try_get("ownership_transparency")?,
            funding_disclosure: row.try_get("funding_disclosure")?,
            ethics_code_public: row.try_get("ethics_code_public")?,
        }))
    }

    /// Fresh cached reputation score for an outlet, if one exists.
    pub(crate) async fn cached_reputation_score(
        &self,
        outlet_name: &str,
    ) -> StoreResult<Option<i32>> {
        let row = sqlx::query(
            "SELECT reputation_score FROM outlet_reputation_scores WHERE LOWER(outlet_name) = LOWER($1)",
        )
        .bind(outlet_name)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("reputation_score")?)),
            None => Ok(None),
        }
    }

    /// Write derived scores back into the agency row and refresh the
    /// outlet reputation cache, atomically.
    pub(crate) async fn store_reputation(
        &self,
        metrics: &AgencyMetrics,
        scores: ReputationScores,
    ) -> StoreResult<()> {
        let tier = PressFreedomTier::from_ranking(metrics.press_freedom_ranking);
        let total_major_awards = metrics.pulitzer_awards
            + metrics.murrow_awards
            + metrics.peabody_awards
            + metrics.emmy_awards;

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            UPDATE news_agency_reputation_metrics
            SET total_awards_score = $2,
                professional_standing_score = $3,
                credibility_score = $4,
                final_reputation_score = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(metrics.id)
        .bind(scores.total_awards_score)
        .bind(scores.professional_standing_score)
        .bind(scores.credibility_score)
        .bind(scores.final_reputation_score)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO outlet_reputation_scores
                (outlet_name, reputation_score, reputation_metrics_id, total_major_awards,
                 has_fact_checking, press_freedom_tier, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (outlet_name) DO UPDATE SET
                reputation_score = EXCLUDED.reputation_score,
                reputation_metrics_id = EXCLUDED.reputation_metrics_id,
                total_major_awards = EXCLUDED.total_major_awards,
                has_fact_checking = EXCLUDED.has_fact_checking,
                press_freedom_tier = EXCLUDED.press_freedom_tier,
                last_updated = NOW()
            ",
        )
        .bind(&metrics.outlet_name)
        .bind(scores.final_reputation_score)
        .bind(metrics.id)
        .bind(total_major_awards)
        .bind(metrics.fact_checking_standards)
        .bind(tier.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Active feeds joined with their agency reputation rows, for the
    /// startup validator.
    pub(crate) async fn feed_agency_rows(&self) -> StoreResult<Vec<FeedAgencyRow>> {
        let rows = sqlx::query(
            r"
            SELECT rf.id, rf.outlet_name, rf.url, rf.news_agency_id,
                   narm.outlet_name AS agency_name, narm.final_reputation_score
            FROM rss_feeds rf
            LEFT JOIN news_agency_reputation_metrics narm ON rf.news_agency_id = narm.id
            WHERE rf.active = TRUE
            ORDER BY rf.outlet_name
            ",
        )
        .fetch_all(self.pool())
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(FeedAgencyRow {
                feed_id: row.try_get("id")?,
                outlet_name: row.try_get("outlet_name")?,
                url: row.try_get("url")?,
                news_agency_id: row.try_get("news_agency_id")?,
                agency_name: row.try_get("agency_name")?,
                final_reputation_score: row.try_get("final_reputation_score")?,
            });
        }
        Ok(result)
    }

    /// Single-outlet variant of the feed/agency join, for the validated
    /// reputation path in quality composition.
    pub(crate) async fn feed_agency_for_outlet(
        &self,
        outlet_name: &str,
    ) -> StoreResult<Option<FeedAgencyRow>> {
        let row = sqlx::query(
            r"
            SELECT rf.id, rf.outlet_name, rf.url, rf.news_agency_id,
                   narm.outlet_name AS agency_name, narm.final_reputation_score
            FROM rss_feeds rf
            LEFT JOIN news_agency_reputation_metrics narm ON rf.news_agency_id = narm.id
            WHERE LOWER(rf.outlet_name) = LOWER($1) AND rf.active = TRUE
            ",
        )
        .bind(outlet_name)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(FeedAgencyRow {
            feed_id: row.try_get("id")?,
            outlet_name: row.try_get("outlet_name")?,
            url: row.try_get("url")?,
            news_agency_id: row.try_get("news_agency_id")?,
            agency_name: row.try_get("agency_name")?,
            final_reputation_score: row.try_get("final_reputation_score")?,
        }))
    }

    pub(crate) async fn agency_names(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT outlet_name FROM news_agency_reputation_metrics ORDER BY outlet_name",
        )
        .fetch_all(self.pool())
        .await?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            names.push(row.try_get("outlet_name")?);
        }
        Ok(names)
    }
}
