use sqlx::Row;

use super::Dao;
use crate::store::error::StoreResult;
use crate::store::models::Feed;

impl Dao {
    /// Active feeds in deterministic order for the scheduler tick.
    pub(crate) async fn list_active_feeds(&self) -> StoreResult<Vec<Feed>> {
        let rows = sqlx::query(
            r"
            SELECT id, url, outlet_name, last_fetched, poll_interval_minutes
            FROM rss_feeds
            WHERE active = TRUE
            ORDER BY id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        let mut feeds = Vec::with_capacity(rows.len());
        for row in rows {
            feeds.push(Feed {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                outlet_name: row.try_get("outlet_name")?,
                last_fetched: row.try_get("last_fetched")?,
                poll_interval_minutes: row.try_get("poll_interval_minutes")?,
            });
        }

        Ok(feeds)
    }

    /// Claim a due feed by advancing `last_fetched` in the same statement.
    /// Returns false when another worker claimed it first or the feed is no
    /// longer due.
    pub(crate) async fn claim_feed_due(
        &self,
        feed_id: i64,
        due_after_secs: f64,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            r"
            UPDATE rss_feeds
            SET last_fetched = NOW()
            WHERE id = $1
              AND active = TRUE
              AND (last_fetched IS NULL
                   OR last_fetched <= NOW() - make_interval(secs => $2))
            RETURNING id
            ",
        )
        .bind(feed_id)
        .bind(due_after_secs)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.is_some())
    }

    /// Advance `last_fetched` after a fetch task completes (success or
    /// handled failure) so an outage never hot-loops.
    pub(crate) async fn touch_feed_last_fetched(&self, feed_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE rss_feeds SET last_fetched = NOW() WHERE id = $1")
            .bind(feed_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
