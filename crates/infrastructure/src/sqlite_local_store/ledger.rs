//! Pending-mutation ledger persistence.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{LedgerAction, NewLedgerEntry, SyncLedgerEntry};

use super::{SqliteLocalStore, storage_error};

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: i64,
    entity_type: String,
    entity_id: i64,
    action: String,
    payload_json: String,
    synced: bool,
    created_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
}

impl LedgerRow {
    fn into_entry(self) -> AppResult<SyncLedgerEntry> {
        Ok(SyncLedgerEntry {
            id: self.id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: LedgerAction::from_str(&self.action)?,
            payload: serde_json::from_str(&self.payload_json).map_err(|error| {
                AppError::Storage(format!("corrupt sync_ledger.payload_json column: {error}"))
            })?,
            synced: self.synced,
            created_at: self.created_at,
            synced_at: self.synced_at,
        })
    }
}

impl SqliteLocalStore {
    pub(super) async fn append_ledger_entry_impl(&self, entry: &NewLedgerEntry) -> AppResult<i64> {
        let payload_json = entry.payload.to_string();

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sync_ledger (entity_type, entity_id, action, payload_json, synced, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(payload_json)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error("append ledger entry"))?;

        Ok(id)
    }

    pub(super) async fn pending_ledger_entries_impl(&self) -> AppResult<Vec<SyncLedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, entity_type, entity_id, action, payload_json, synced, created_at, synced_at \
             FROM sync_ledger WHERE synced = 0 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("list pending ledger entries"))?;

        rows.into_iter().map(LedgerRow::into_entry).collect()
    }

    pub(super) async fn mark_ledger_entry_synced_impl(&self, id: i64) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE sync_ledger SET synced = 1, synced_at = ? WHERE id = ? AND synced = 0",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("mark ledger entry synced"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("pending ledger entry {id}")));
        }

        Ok(())
    }
}
