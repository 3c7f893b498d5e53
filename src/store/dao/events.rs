use sqlx::Row;

use super::Dao;
use crate::store::error::StoreResult;
use crate::store::models::{EventArticleRow, EventClaimRow, EventMetricsRow};

impl Dao {
    /// Create an event, its membership links, and the members' back
    /// references in one transaction. A failure in any step aborts the
    /// whole event.
    pub(crate) async fn insert_event_with_articles(
        &self,
        title: &str,
        description: &str,
        article_ids: &[i64],
    ) -> StoreResult<i64> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            r"
            INSERT INTO events (title, description, created_at, updated_at, active)
            VALUES ($1, $2, NOW(), NOW(), TRUE)
            RETURNING id
            ",
        )
        .bind(title)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;
        let event_id: i64 = row.try_get("id")?;

        for article_id in article_ids {
            sqlx::query(
                r"
                INSERT INTO event_articles (event_id, article_id, relevance_score, added_at)
                VALUES ($1, $2, $3, NOW())
                ",
            )
            .bind(event_id)
            .bind(article_id)
            .bind(1.0_f64)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE articles SET computed_event_id = $1 WHERE id = ANY($2)")
            .bind(event_id)
            .bind(article_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event_id)
    }

    pub(crate) async fn list_event_ids(&self) -> StoreResult<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM events ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get("id")?);
        }
        Ok(ids)
    }

    /// Member articles of an event in publication order, for EQIS.
    pub(crate) async fn event_articles(&self, event_id: i64) -> StoreResult<Vec<EventArticleRow>> {
        let rows = sqlx::query(
            r"
            SELECT ar.id, ar.outlet_name, ar.published_at, ar.body
            FROM articles ar
            JOIN event_articles ea ON ea.article_id = ar.id
            WHERE ea.event_id = $1
            ORDER BY ar.published_at NULLS LAST, ar.id ASC
            ",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(EventArticleRow {
                id: row.try_get("id")?,
                outlet_name: row.try_get("outlet_name")?,
                published_at: row.try_get("published_at")?,
                body: row.try_get("body")?,
            });
        }
        Ok(articles)
    }

    pub(crate) async fn event_claims(&self, event_id: i64) -> StoreResult<Vec<EventClaimRow>> {
        let rows = sqlx::query(
            r"
            SELECT c.article_id, c.verified_state
            FROM claims c
            JOIN event_articles ea ON ea.article_id = c.article_id
            WHERE ea.event_id = $1
            ",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;

        let mut claims = Vec::with_capacity(rows.len());
        for row in rows {
            claims.push(EventClaimRow {
                article_id: row.try_get("article_id")?,
                verified_state: row.try_get("verified_state")?,
            });
        }
        Ok(claims)
    }

    /// Insert or wholesale-replace the EQIS row for an event.
    pub(crate) async fn upsert_event_metrics(&self, metrics: &EventMetricsRow) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO event_metrics
                (event_id, age_days, coverage_sites, keyword_coherence, best_source,
                 corroboration_ratio, contradiction_rate, correction_risk, eqis_score,
                 components, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (event_id) DO UPDATE SET
                age_days = EXCLUDED.age_days,
                coverage_sites = EXCLUDED.coverage_sites,
                keyword_coherence = EXCLUDED.keyword_coherence,
                best_source = EXCLUDED.best_source,
                corroboration_ratio = EXCLUDED.corroboration_ratio,
                contradiction_rate = EXCLUDED.contradiction_rate,
                correction_risk = EXCLUDED.correction_risk,
                eqis_score = EXCLUDED.eqis_score,
                components = EXCLUDED.components,
                computed_at = NOW()
            ",
        )
        .bind(metrics.event_id)
        .bind(metrics.age_days)
        .bind(metrics.coverage_sites)
        .bind(metrics.keyword_coherence)
        .bind(&metrics.best_source)
        .bind(metrics.corroboration_ratio)
        .bind(metrics.contradiction_rate)
        .bind(metrics.correction_risk)
        .bind(metrics.eqis_score)
        .bind(&metrics.components)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
