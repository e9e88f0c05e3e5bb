//! Configuration persistence and whole-store teardown.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use dolimirror_core::AppResult;
use dolimirror_domain::{ConfigEntry, ConfigValueType};

use super::{SqliteLocalStore, storage_error};

#[derive(Debug, sqlx::FromRow)]
struct ConfigRow {
    key: String,
    value: String,
    value_type: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConfigRow> for ConfigEntry {
    fn from(row: ConfigRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            value_type: ConfigValueType::from_str(&row.value_type).unwrap_or_default(),
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl SqliteLocalStore {
    pub(super) async fn configuration_impl(&self, key: &str) -> AppResult<Option<ConfigEntry>> {
        let row = sqlx::query_as::<_, ConfigRow>(
            "SELECT key, value, value_type, description, created_at, updated_at \
             FROM configurations WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("find configuration"))?;

        Ok(row.map(ConfigEntry::from))
    }

    pub(super) async fn configurations_impl(&self) -> AppResult<Vec<ConfigEntry>> {
        let rows = sqlx::query_as::<_, ConfigRow>(
            "SELECT key, value, value_type, description, created_at, updated_at \
             FROM configurations ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("list configurations"))?;

        Ok(rows.into_iter().map(ConfigEntry::from).collect())
    }

    pub(super) async fn set_configuration_impl(
        &self,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        description: Option<&str>,
    ) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO configurations (key, value, value_type, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                description = excluded.description,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type.as_str())
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error("upsert configuration"))?;

        Ok(())
    }

    pub(super) async fn delete_configuration_impl(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM configurations WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_error("delete configuration"))?;

        Ok(())
    }

    pub(super) async fn clear_all_impl(&self) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("begin store teardown"))?;

        for table in [
            "users",
            "groups",
            "permissions",
            "third_parties",
            "products",
            "configurations",
            "sync_ledger",
        ] {
            let sql = format!("DELETE FROM {table}");
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(storage_error("clear collection"))?;
        }

        tx.commit()
            .await
            .map_err(storage_error("commit store teardown"))?;

        Ok(())
    }
}
