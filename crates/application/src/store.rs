//! Local persistence port for mirrored entities, configuration, and the
//! pending-mutation ledger.

use async_trait::async_trait;
use chrono::Utc;

use dolimirror_core::AppResult;
use dolimirror_domain::{
    ConfigEntry, ConfigValueType, Group, NewLedgerEntry, Permission, Product, SyncLedgerEntry,
    ThirdParty, User,
};

/// Port for the persistent, keyed local store.
///
/// Implementations stamp `updated_at` on every mutation and `created_at`
/// on insert; an upsert that hits an existing row preserves the original
/// `created_at`. These are local bookkeeping timestamps, not trust
/// anchors. `replace_*` and `clear_all` are single transactional units:
/// a concurrent reader never observes a partially-replaced collection.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Lists all mirrored users.
    async fn users(&self) -> AppResult<Vec<User>>;

    /// Finds a mirrored user by remote id.
    async fn user(&self, id: i64) -> AppResult<Option<User>>;

    /// Finds a mirrored user by login name.
    async fn user_by_login(&self, login: &str) -> AppResult<Option<User>>;

    /// Inserts or updates a user row keyed by remote id.
    async fn upsert_user(&self, user: &User) -> AppResult<()>;

    /// Deletes a user row.
    async fn delete_user(&self, id: i64) -> AppResult<()>;

    /// Lists all mirrored groups.
    async fn groups(&self) -> AppResult<Vec<Group>>;

    /// Finds a mirrored group by remote id.
    async fn group(&self, id: i64) -> AppResult<Option<Group>>;

    /// Inserts or updates a group row keyed by remote id.
    async fn upsert_group(&self, group: &Group) -> AppResult<()>;

    /// Deletes a group row.
    async fn delete_group(&self, id: i64) -> AppResult<()>;

    /// Lists all known permissions.
    async fn permissions(&self) -> AppResult<Vec<Permission>>;

    /// Lists the permissions belonging to one module.
    async fn permissions_by_module(&self, module: &str) -> AppResult<Vec<Permission>>;

    /// Inserts permission rows, skipping names that already exist.
    async fn insert_permissions(&self, rows: &[Permission]) -> AppResult<()>;

    /// Lists the third-party mirror.
    async fn third_parties(&self) -> AppResult<Vec<ThirdParty>>;

    /// Finds a third party by remote id.
    async fn third_party(&self, id: i64) -> AppResult<Option<ThirdParty>>;

    /// Inserts or updates a third-party row keyed by remote id.
    async fn upsert_third_party(&self, row: &ThirdParty) -> AppResult<()>;

    /// Deletes a third-party row.
    async fn delete_third_party(&self, id: i64) -> AppResult<()>;

    /// Replaces the whole third-party mirror in one transaction.
    async fn replace_third_parties(&self, rows: &[ThirdParty]) -> AppResult<()>;

    /// Lists the product mirror.
    async fn products(&self) -> AppResult<Vec<Product>>;

    /// Finds a product by remote id.
    async fn product(&self, id: i64) -> AppResult<Option<Product>>;

    /// Inserts or updates a product row keyed by remote id.
    async fn upsert_product(&self, row: &Product) -> AppResult<()>;

    /// Deletes a product row.
    async fn delete_product(&self, id: i64) -> AppResult<()>;

    /// Replaces the whole product mirror in one transaction.
    async fn replace_products(&self, rows: &[Product]) -> AppResult<()>;

    /// Finds a configuration entry by key.
    async fn configuration(&self, key: &str) -> AppResult<Option<ConfigEntry>>;

    /// Lists every configuration entry.
    async fn configurations(&self) -> AppResult<Vec<ConfigEntry>>;

    /// Upserts a configuration entry by its unique key.
    async fn set_configuration(
        &self,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        description: Option<&str>,
    ) -> AppResult<()>;

    /// Deletes a configuration entry; missing keys are not an error.
    async fn delete_configuration(&self, key: &str) -> AppResult<()>;

    /// Appends an unsynced ledger entry and returns its assigned id.
    async fn append_ledger_entry(&self, entry: &NewLedgerEntry) -> AppResult<i64>;

    /// Lists ledger entries still awaiting remote acknowledgement.
    async fn pending_ledger_entries(&self) -> AppResult<Vec<SyncLedgerEntry>>;

    /// Flags a ledger entry as acknowledged, stamping `synced_at`.
    async fn mark_ledger_entry_synced(&self, id: i64) -> AppResult<()>;

    /// Wipes every collection in one transaction.
    async fn clear_all(&self) -> AppResult<()>;
}

/// Seeds an empty store with the bootstrap admin user and the default
/// permission rows. Idempotent: non-empty collections are left alone.
pub async fn seed_defaults(store: &dyn LocalStore) -> AppResult<()> {
    let now = Utc::now();

    if store.users().await?.is_empty() {
        store.upsert_user(&User::bootstrap_admin(now)).await?;
    }

    if store.permissions().await?.is_empty() {
        store.insert_permissions(&Permission::defaults(now)).await?;
    }

    Ok(())
}
