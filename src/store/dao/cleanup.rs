use sqlx::Row;

use super::Dao;
use crate::store::error::StoreResult;
use crate::store::models::CleanupStatus;

impl Dao {
    /// Open a cleanup-log row in `running` state; returns its id.
    pub(crate) async fn begin_cleanup_run(&self, cleanup_type: &str) -> StoreResult<i64> {
        let row = sqlx::query(
            r"
            INSERT INTO cleanup_log (cleanup_type, started_at, status)
            VALUES ($1, NOW(), $2)
            RETURNING id
            ",
        )
        .bind(cleanup_type)
        .bind(CleanupStatus::Running.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(row.try_get("id")?)
    }

    pub(crate) async fn complete_cleanup_run(
        &self,
        run_id: i64,
        records_deleted: i64,
        batch_count: i32,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE cleanup_log
            SET completed_at = NOW(), records_deleted = $2, batch_count = $3, status = $4
            WHERE id = $1
            ",
        )
        .bind(run_id)
        .bind(records_deleted)
        .bind(batch_count)
        .bind(CleanupStatus::Completed.as_str())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub(crate) async fn fail_cleanup_run(&self, run_id: i64, error_message: &str) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE cleanup_log
            SET completed_at = NOW(), status = $2, error_message = $3
            WHERE id = $1
            ",
        )
        .bind(run_id)
        .bind(CleanupStatus::Error.as_str())
        .bind(error_message)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Delete one batch of expired articles together with their claims and
    /// event links. Articles without a published instant age by fetch time.
    /// Returns the number of articles removed.
    pub(crate) async fn delete_expired_articles(
        &self,
        retention_hours: i32,
        batch_size: i64,
    ) -> StoreResult<u64> {
        let mut tx = self.pool().begin().await?;

        let rows = sqlx::query(
            r"
            SELECT id FROM articles
            WHERE COALESCE(published_at, fetched_at) < NOW() - make_interval(hours => $1)
            ORDER BY id
            LIMIT $2
            ",
        )
        .bind(retention_hours)
        .bind(batch_size)
        .fetch_all(&mut *tx)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64, _>("id")?);
        }
        if ids.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        sqlx::query("DELETE FROM claims WHERE article_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM event_articles WHERE article_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM articles WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    /// Delete one batch of expired events with their links and EQIS rows.
    pub(crate) async fn delete_expired_events(
        &self,
        retention_hours: i32,
        batch_size: i64,
    ) -> StoreResult<u64> {
        let mut tx = self.pool().begin().await?;

        let rows = sqlx::query(
            r"
            SELECT id FROM events
            WHERE created_at < NOW() - make_interval(hours => $1)
            ORDER BY id
            LIMIT $2
            ",
        )
        .bind(retention_hours)
        .bind(batch_size)
        .fetch_all(&mut *tx)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64, _>("id")?);
        }
        if ids.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        sqlx::query("DELETE FROM event_articles WHERE event_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM event_metrics WHERE event_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE articles SET computed_event_id = NULL WHERE computed_event_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM events WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    /// Delete one batch of expired performance snapshots.
    pub(crate) async fn delete_expired_snapshots(
        &self,
        retention_hours: i32,
        batch_size: i64,
    ) -> StoreResult<u64> {
        let deleted = sqlx::query(
            r"
            DELETE FROM performance_config_snapshots
            WHERE id IN (
                SELECT id FROM performance_config_snapshots
                WHERE snapshot_timestamp < NOW() - make_interval(hours => $1)
                ORDER BY id
                LIMIT $2
            )
            ",
        )
        .bind(retention_hours)
        .bind(batch_size)
        .execute(self.pool())
        .await?
        .rows_affected();

        Ok(deleted)
    }
}
