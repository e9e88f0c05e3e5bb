//! SQLite-backed local store.
//!
//! The embedded client-side mirror: one database file (or an in-memory
//! database in tests), schema created on open, explicit transactions
//! around every whole-snapshot replacement.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use dolimirror_application::LocalStore;
use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{
    ConfigEntry, ConfigValueType, Group, NewLedgerEntry, Permission, Product, SyncLedgerEntry,
    ThirdParty, User,
};

mod identity;
mod ledger;
mod mirrors;
mod settings;

#[cfg(test)]
mod tests;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        login TEXT NOT NULL,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        email TEXT NOT NULL,
        admin INTEGER NOT NULL,
        active INTEGER NOT NULL,
        groups_json TEXT NOT NULL,
        permissions_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_login TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_users_login ON users (login)",
    "CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        permissions_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS permissions (
        name TEXT PRIMARY KEY,
        module TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_permissions_module ON permissions (module)",
    "CREATE TABLE IF NOT EXISTS third_parties (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        name_alias TEXT,
        address TEXT,
        zip TEXT,
        town TEXT,
        state TEXT,
        country TEXT,
        phone TEXT,
        email TEXT,
        website TEXT,
        client INTEGER NOT NULL,
        supplier INTEGER NOT NULL,
        prospect INTEGER NOT NULL,
        status TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_contact TEXT
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY,
        reference TEXT NOT NULL,
        label TEXT NOT NULL,
        description TEXT,
        kind TEXT NOT NULL,
        price REAL NOT NULL,
        price_incl_tax REAL NOT NULL,
        status INTEGER NOT NULL,
        category TEXT NOT NULL,
        stock INTEGER NOT NULL,
        stock_alert INTEGER NOT NULL,
        image_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS configurations (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        value_type TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sync_ledger (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_type TEXT NOT NULL,
        entity_id INTEGER NOT NULL,
        action TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        synced_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_ledger_synced ON sync_ledger (synced)",
];

/// SQLite implementation of the [`LocalStore`] port.
#[derive(Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Opens (creating if missing) the database at the given sqlx URL and
    /// applies the schema.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|error| {
                AppError::Configuration(format!("invalid local store URL '{url}': {error}"))
            })?
            .create_if_missing(true);

        // One connection: the embedded mirror serializes all access, and
        // an in-memory database must not be split across connections.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|error| AppError::Storage(format!("failed to open local store: {error}")))?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// Opens a fresh in-memory database.
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn apply_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Storage(format!("failed to apply local store schema: {error}"))
                })?;
        }

        Ok(())
    }
}

fn storage_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |error| AppError::Storage(format!("failed to {operation}: {error}"))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> AppResult<T> {
    serde_json::from_str(raw)
        .map_err(|error| AppError::Storage(format!("corrupt {column} column: {error}")))
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn users(&self) -> AppResult<Vec<User>> {
        self.users_impl().await
    }

    async fn user(&self, id: i64) -> AppResult<Option<User>> {
        self.user_impl(id).await
    }

    async fn user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        self.user_by_login_impl(login).await
    }

    async fn upsert_user(&self, user: &User) -> AppResult<()> {
        self.upsert_user_impl(user).await
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.delete_user_impl(id).await
    }

    async fn groups(&self) -> AppResult<Vec<Group>> {
        self.groups_impl().await
    }

    async fn group(&self, id: i64) -> AppResult<Option<Group>> {
        self.group_impl(id).await
    }

    async fn upsert_group(&self, group: &Group) -> AppResult<()> {
        self.upsert_group_impl(group).await
    }

    async fn delete_group(&self, id: i64) -> AppResult<()> {
        self.delete_group_impl(id).await
    }

    async fn permissions(&self) -> AppResult<Vec<Permission>> {
        self.permissions_impl().await
    }

    async fn permissions_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        self.permissions_by_module_impl(module).await
    }

    async fn insert_permissions(&self, rows: &[Permission]) -> AppResult<()> {
        self.insert_permissions_impl(rows).await
    }

    async fn third_parties(&self) -> AppResult<Vec<ThirdParty>> {
        self.third_parties_impl().await
    }

    async fn third_party(&self, id: i64) -> AppResult<Option<ThirdParty>> {
        self.third_party_impl(id).await
    }

    async fn upsert_third_party(&self, row: &ThirdParty) -> AppResult<()> {
        self.upsert_third_party_impl(row).await
    }

    async fn delete_third_party(&self, id: i64) -> AppResult<()> {
        self.delete_third_party_impl(id).await
    }

    async fn replace_third_parties(&self, rows: &[ThirdParty]) -> AppResult<()> {
        self.replace_third_parties_impl(rows).await
    }

    async fn products(&self) -> AppResult<Vec<Product>> {
        self.products_impl().await
    }

    async fn product(&self, id: i64) -> AppResult<Option<Product>> {
        self.product_impl(id).await
    }

    async fn upsert_product(&self, row: &Product) -> AppResult<()> {
        self.upsert_product_impl(row).await
    }

    async fn delete_product(&self, id: i64) -> AppResult<()> {
        self.delete_product_impl(id).await
    }

    async fn replace_products(&self, rows: &[Product]) -> AppResult<()> {
        self.replace_products_impl(rows).await
    }

    async fn configuration(&self, key: &str) -> AppResult<Option<ConfigEntry>> {
        self.configuration_impl(key).await
    }

    async fn configurations(&self) -> AppResult<Vec<ConfigEntry>> {
        self.configurations_impl().await
    }

    async fn set_configuration(
        &self,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        description: Option<&str>,
    ) -> AppResult<()> {
        self.set_configuration_impl(key, value, value_type, description)
            .await
    }

    async fn delete_configuration(&self, key: &str) -> AppResult<()> {
        self.delete_configuration_impl(key).await
    }

    async fn append_ledger_entry(&self, entry: &NewLedgerEntry) -> AppResult<i64> {
        self.append_ledger_entry_impl(entry).await
    }

    async fn pending_ledger_entries(&self) -> AppResult<Vec<SyncLedgerEntry>> {
        self.pending_ledger_entries_impl().await
    }

    async fn mark_ledger_entry_synced(&self, id: i64) -> AppResult<()> {
        self.mark_ledger_entry_synced_impl(id).await
    }

    async fn clear_all(&self) -> AppResult<()> {
        self.clear_all_impl().await
    }
}
