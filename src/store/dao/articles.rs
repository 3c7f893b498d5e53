use serde_json::json;
use sqlx::Row;

use super::Dao;
use crate::analysis::ner::CategorizedEntities;
use crate::store::error::StoreResult;
use crate::store::models::{ArticleRecord, NewArticle};

impl Dao {
    pub(crate) async fn article_url_exists(&self, url: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT id FROM articles WHERE url = $1")
            .bind(url)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Insert an article keyed by URL. A conflicting URL is a no-op; the
    /// existing row's id is returned either way.
    pub(crate) async fn upsert_article_by_url(&self, article: &NewArticle) -> StoreResult<i64> {
        let inserted = sqlx::query(
            r"
            INSERT INTO articles
                (url, outlet_name, title, author, published_at, published_parse_failed,
                 fetched_at, body, raw_html, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7, $8, $9)
            ON CONFLICT (url) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&article.url)
        .bind(&article.outlet_name)
        .bind(&article.title)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(article.published_parse_failed)
        .bind(&article.body)
        .bind(&article.raw_html)
        .bind(article.feed_id)
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = inserted {
            return Ok(row.try_get("id")?);
        }

        let existing = sqlx::query("SELECT id FROM articles WHERE url = $1")
            .bind(&article.url)
            .fetch_one(self.pool())
            .await?;
        Ok(existing.try_get("id")?)
    }

    /// Batch selection for the composition worker. Articles missing NER
    /// data come first (permanent backfill), then recent articles whose
    /// quality score is absent or stale.
    pub(crate) async fn select_unprocessed_articles(
        &self,
        limit: i64,
    ) -> StoreResult<Vec<ArticleRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, url, title, outlet_name, published_at, published_parse_failed, body
            FROM articles
            WHERE body IS NOT NULL
              AND LENGTH(body) > 100
              AND (
                    (published_at > NOW() - INTERVAL '72 hours'
                     AND (quality_score IS NULL
                          OR quality_computed_at < NOW() - INTERVAL '1 hour'))
                 OR ner_extracted_at IS NULL
              )
            ORDER BY
                CASE WHEN ner_extracted_at IS NULL THEN 0 ELSE 1 END,
                published_at DESC NULLS LAST
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(ArticleRecord {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                title: row.try_get("title")?,
                outlet_name: row.try_get("outlet_name")?,
                published_at: row.try_get("published_at")?,
                published_parse_failed: row.try_get("published_parse_failed")?,
                body: row.try_get("body")?,
            });
        }

        Ok(articles)
    }

    /// Persist quality score and NER columns for one article in a single
    /// statement, stamping both computed-at instants.
    pub(crate) async fn update_article_scores_and_ner(
        &self,
        article_id: i64,
        quality_score: i32,
        entities: &CategorizedEntities,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE articles
            SET quality_score = $2,
                quality_computed_at = NOW(),
                ner_persons = $3,
                ner_organizations = $4,
                ner_locations = $5,
                ner_dates = $6,
                ner_others = $7,
                ner_extracted_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(article_id)
        .bind(quality_score)
        .bind(json!(entities.persons))
        .bind(json!(entities.organizations))
        .bind(json!(entities.locations))
        .bind(json!(entities.dates))
        .bind(json!(entities.others))
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
