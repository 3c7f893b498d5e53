use sqlx::Row;

use super::Dao;
use crate::grouping::manager::NewSnapshot;
use crate::store::error::StoreResult;
use crate::store::models::{NewConfigChangeEvent, SnapshotRow};

fn snapshot_from_row(row: &sqlx::postgres::PgRow) -> Result<SnapshotRow, sqlx::Error> {
    Ok(SnapshotRow {
        min_shared_entities: row.try_get("min_shared_entities")?,
        entity_overlap_threshold: row.try_get("entity_overlap_threshold")?,
        min_title_keywords: row.try_get("min_title_keywords")?,
        title_keyword_bonus: row.try_get("title_keyword_bonus")?,
        max_time_diff_hours: row.try_get("max_time_diff_hours")?,
        allow_same_outlet: row.try_get("allow_same_outlet")?,
        min_entity_length: row.try_get("min_entity_length")?,
        max_entity_length: row.try_get("max_entity_length")?,
        entity_noise_threshold: row.try_get("entity_noise_threshold")?,
        performance_score: row.try_get("performance_score")?,
        config_generation: row.try_get("config_generation")?,
    })
}

const SNAPSHOT_COLUMNS: &str = r"
    min_shared_entities, entity_overlap_threshold, min_title_keywords,
    title_keyword_bonus, max_time_diff_hours, allow_same_outlet,
    min_entity_length, max_entity_length, entity_noise_threshold,
    performance_score, config_generation
";

impl Dao {
    /// Highest-scoring snapshot from the last 30 days with an acceptable
    /// score and runtime/manual provenance.
    pub(crate) async fn load_best_recent_snapshot(
        &self,
        min_score: f64,
    ) -> StoreResult<Option<SnapshotRow>> {
        let query = format!(
            r"
            SELECT {SNAPSHOT_COLUMNS}
            FROM performance_config_snapshots
            WHERE snapshot_timestamp > NOW() - INTERVAL '30 days'
              AND performance_score IS NOT NULL
              AND performance_score >= $1
              AND config_source IN ('runtime', 'manual')
            ORDER BY performance_score DESC, snapshot_timestamp DESC
            LIMIT 1
            "
        );
        let row = sqlx::query(&query)
            .bind(min_score)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(snapshot_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn load_latest_snapshot(&self) -> StoreResult<Option<SnapshotRow>> {
        let query = format!(
            r"
            SELECT {SNAPSHOT_COLUMNS}
            FROM performance_config_snapshots
            ORDER BY id DESC
            LIMIT 1
            "
        );
        let row = sqlx::query(&query).fetch_optional(self.pool()).await?;

        match row {
            Some(row) => Ok(Some(snapshot_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Append one configuration + performance snapshot; returns its id.
    pub(crate) async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StoreResult<i64> {
        let config = &snapshot.config;
        let metrics = snapshot.metrics.as_ref();
        let scores = snapshot.scores.as_ref();

        let row = sqlx::query(
            r"
            INSERT INTO performance_config_snapshots (
                min_shared_entities, entity_overlap_threshold, min_title_keywords,
                title_keyword_bonus, max_time_diff_hours, allow_same_outlet,
                min_entity_length, max_entity_length, entity_noise_threshold,
                articles_processed, events_created, processing_time_ms, entities_extracted_total,
                event_creation_rate, coverage_percentage, avg_articles_per_event,
                singleton_events_count, entities_per_article,
                performance_score, effectiveness_score, efficiency_score, coverage_score,
                precision_score, score_trend,
                config_source, service_instance, notes, config_generation, snapshot_timestamp
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9,
                $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24,
                $25, $26, $27, $28, NOW()
            )
            RETURNING id
            ",
        )
        .bind(config.min_shared_entities)
        .bind(config.entity_overlap_threshold)
        .bind(config.min_title_keywords)
        .bind(config.title_keyword_bonus)
        .bind(config.max_time_diff_hours)
        .bind(config.allow_same_outlet)
        .bind(config.min_entity_length)
        .bind(config.max_entity_length)
        .bind(config.entity_noise_threshold)
        .bind(metrics.map_or(0, |m| m.articles_processed as i64))
        .bind(metrics.map_or(0, |m| m.events_created as i64))
        .bind(metrics.map_or(0, |m| m.processing_time_ms as i64))
        .bind(metrics.map_or(0, |m| m.entities_extracted_total as i64))
        .bind(metrics.map_or(0.0, |m| m.event_creation_rate))
        .bind(metrics.map_or(0.0, |m| m.coverage_percentage))
        .bind(metrics.map_or(0.0, |m| m.avg_articles_per_event))
        .bind(metrics.map_or(0, |m| m.singleton_events_count as i64))
        .bind(metrics.map_or(0.0, |m| m.entities_per_article))
        .bind(scores.map(|s| s.overall))
        .bind(scores.map(|s| s.effectiveness))
        .bind(scores.map(|s| s.efficiency))
        .bind(scores.map(|s| s.coverage))
        .bind(scores.map(|s| s.precision))
        .bind(scores.map(|s| s.trend.as_str()))
        .bind(snapshot.config_source.as_str())
        .bind(&snapshot.service_instance)
        .bind(&snapshot.notes)
        .bind(snapshot.config_generation)
        .fetch_one(self.pool())
        .await?;

        Ok(row.try_get("id")?)
    }

    pub(crate) async fn insert_config_change_event(
        &self,
        event: &NewConfigChangeEvent,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO config_change_events (
                parameter_name, old_value, new_value, change_reason,
                previous_score, target_improvement, config_snapshot_id, triggered_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&event.parameter_name)
        .bind(&event.old_value)
        .bind(&event.new_value)
        .bind(&event.change_reason)
        .bind(event.previous_score)
        .bind(&event.target_improvement)
        .bind(event.config_snapshot_id)
        .bind(&event.triggered_by)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
