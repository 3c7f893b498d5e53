use sqlx::Row;
use tracing::warn;

use super::Dao;
use crate::store::error::StoreResult;

impl Dao {
    pub(crate) async fn config_value(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT config_value FROM system_config WHERE config_key = $1")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("config_value")?)),
            None => Ok(None),
        }
    }

    /// Integer config value with a default for missing or unparseable rows.
    pub(crate) async fn config_value_i64(&self, key: &str, default: i64) -> StoreResult<i64> {
        match self.config_value(key).await? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!(key, raw, "unparseable config value, using default");
                    Ok(default)
                }
            },
        }
    }

    pub(crate) async fn set_config_value(
        &self,
        key: &str,
        value: &str,
        description: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO system_config (config_key, config_value, description, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (config_key) DO UPDATE SET
                config_value = EXCLUDED.config_value,
                description = EXCLUDED.description,
                updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
