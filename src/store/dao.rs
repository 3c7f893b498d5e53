//! Typed operations over the durable store.
//!
//! One `Dao` wraps the `PgPool`; the per-area operations live in the
//! sibling files as additional `impl Dao` blocks. Every connection sets
//! its session timezone to UTC before use.

pub(crate) mod articles;
pub(crate) mod claims;
pub(crate) mod cleanup;
pub(crate) mod events;
pub(crate) mod feeds;
pub(crate) mod reputation;
pub(crate) mod snapshots;
pub(crate) mod system_config;

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::config::Config;
use crate::store::error::StoreResult;

/// Connection attempts made before giving up at startup, with exponential
/// backoff 1-2-4-8-16s between them.
const CONNECT_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub(crate) struct Dao {
    pool: PgPool,
}

impl Dao {
    #[must_use]
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build the pool and verify connectivity, retrying transient failures.
    pub(crate) async fn connect(config: &Config) -> anyhow::Result<Self> {
        let options = PgPoolOptions::new()
            .max_connections(config.db_max_connections())
            .acquire_timeout(config.db_acquire_timeout())
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET timezone = 'UTC'").execute(conn).await?;
                    Ok(())
                })
            });

        let mut last_error: Option<sqlx::Error> = None;
        for attempt in 0..CONNECT_ATTEMPTS {
            if attempt > 0 {
                let wait = Duration::from_secs(1 << (attempt - 1));
                warn!(
                    attempt = attempt + 1,
                    wait_secs = wait.as_secs(),
                    "store connection failed, retrying"
                );
                tokio::time::sleep(wait).await;
            }

            match options.clone().connect(config.database_url()).await {
                Ok(pool) => {
                    info!(attempt = attempt + 1, "connected to store");
                    return Ok(Self::new(pool));
                }
                Err(error) => last_error = Some(error),
            }
        }

        Err(anyhow::Error::new(last_error.expect("at least one attempt ran")))
            .context("store unreachable after retries")
    }

    pub(crate) async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Whether a relation exists in the connected database.
    pub(crate) async fn table_exists(&self, name: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT to_regclass($1) IS NOT NULL AS present")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("present")?)
    }

    /// Row counts surfaced by the startup health check.
    pub(crate) async fn startup_counts(&self) -> StoreResult<(i64, i64, i64)> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM articles) AS articles,
                (SELECT COUNT(*) FROM events) AS events,
                (SELECT COUNT(*) FROM articles WHERE ner_extracted_at IS NULL) AS unprocessed
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((
            row.try_get("articles")?,
            row.try_get("events")?,
            row.try_get("unprocessed")?,
        ))
    }
}
