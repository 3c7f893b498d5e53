//! Retention cleanup.
//!
//! A periodic job that deletes articles, events and performance snapshots
//! past their configured retention, in batches, writing one cleanup-log
//! row per table per run. Articles take their claims and event links with
//! them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use crate::store::dao::Dao;
use crate::store::error::StoreResult;

const DEFAULT_ARTICLE_RETENTION_HOURS: i64 = 72;
const DEFAULT_EVENT_RETENTION_HOURS: i64 = 96;
const DEFAULT_METRICS_RETENTION_HOURS: i64 = 168;
const DEFAULT_CLEANUP_BATCH_SIZE: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CleanupOutcome {
    pub(crate) records_deleted: i64,
    pub(crate) batch_count: i32,
}

pub(crate) struct CleanupDaemon {
    dao: Arc<Dao>,
    interval: std::time::Duration,
}

impl CleanupDaemon {
    pub(crate) fn new(dao: Arc<Dao>, interval: std::time::Duration) -> Self {
        Self { dao, interval }
    }

    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "cleanup daemon started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }

            if let Err(error) = self.run_once().await {
                error!(error = %error, "cleanup run failed");
            }
        }

        info!("cleanup daemon stopped");
    }

    /// One full cleanup pass over all retention classes. Each class gets
    /// its own log row; a failing class does not stop the others.
    pub(crate) async fn run_once(&self) -> StoreResult<()> {
        let article_hours = self
            .dao
            .config_value_i64("article_retention_hours", DEFAULT_ARTICLE_RETENTION_HOURS)
            .await?;
        let event_hours = self
            .dao
            .config_value_i64("event_retention_hours", DEFAULT_EVENT_RETENTION_HOURS)
            .await?;
        let metrics_hours = self
            .dao
            .config_value_i64("metrics_retention_hours", DEFAULT_METRICS_RETENTION_HOURS)
            .await?;
        let batch_size = self
            .dao
            .config_value_i64("cleanup_batch_size", DEFAULT_CLEANUP_BATCH_SIZE)
            .await?
            .max(1);

        self.run_class("articles", article_hours, batch_size, |hours, batch| {
            let dao = Arc::clone(&self.dao);
            async move { dao.delete_expired_articles(hours, batch).await }
        })
        .await;

        self.run_class("events", event_hours, batch_size, |hours, batch| {
            let dao = Arc::clone(&self.dao);
            async move { dao.delete_expired_events(hours, batch).await }
        })
        .await;

        self.run_class("metrics", metrics_hours, batch_size, |hours, batch| {
            let dao = Arc::clone(&self.dao);
            async move { dao.delete_expired_snapshots(hours, batch).await }
        })
        .await;

        Ok(())
    }

    async fn run_class<F, Fut>(
        &self,
        cleanup_type: &str,
        retention_hours: i64,
        batch_size: i64,
        delete_batch: F,
    ) where
        F: Fn(i32, i64) -> Fut,
        Fut: Future<Output = StoreResult<u64>>,
    {
        let run_id = match self.dao.begin_cleanup_run(cleanup_type).await {
            Ok(id) => id,
            Err(error) => {
                error!(cleanup_type, error = %error, "failed to open cleanup log row");
                return;
            }
        };

        let mut outcome = CleanupOutcome {
            records_deleted: 0,
            batch_count: 0,
        };

        loop {
            match delete_batch(retention_hours as i32, batch_size).await {
                Ok(deleted) => {
                    outcome.records_deleted += deleted as i64;
                    outcome.batch_count += 1;
                    if (deleted as i64) < batch_size {
                        break;
                    }
                }
                Err(error) => {
                    error!(cleanup_type, error = %error, "cleanup batch failed");
                    if let Err(log_error) = self
                        .dao
                        .fail_cleanup_run(run_id, &error.to_string())
                        .await
                    {
                        error!(cleanup_type, error = %log_error, "failed to record cleanup error");
                    }
                    return;
                }
            }
        }

        if let Err(error) = self
            .dao
            .complete_cleanup_run(run_id, outcome.records_deleted, outcome.batch_count)
            .await
        {
            error!(cleanup_type, error = %error, "failed to close cleanup log row");
            return;
        }

        info!(
            cleanup_type,
            retention_hours,
            records_deleted = outcome.records_deleted,
            batches = outcome.batch_count,
            "cleanup class complete"
        );
    }
}
