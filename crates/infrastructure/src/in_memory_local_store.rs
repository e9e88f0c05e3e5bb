//! In-memory local store implementation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use dolimirror_application::LocalStore;
use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{
    ConfigEntry, ConfigValueType, Group, NewLedgerEntry, Permission, Product, SyncLedgerEntry,
    ThirdParty, User,
};

#[derive(Default)]
struct Ledger {
    entries: Vec<SyncLedgerEntry>,
    next_id: i64,
}

/// In-memory [`LocalStore`] implementation.
///
/// Snapshot mirrors are held as vectors so the stored order is the order
/// rows arrived in; replacement swaps the whole vector under one write
/// lock, so readers never observe a partial mirror.
#[derive(Default)]
pub struct InMemoryLocalStore {
    users: RwLock<HashMap<i64, User>>,
    groups: RwLock<HashMap<i64, Group>>,
    permissions: RwLock<BTreeMap<String, Permission>>,
    third_parties: RwLock<Vec<ThirdParty>>,
    products: RwLock<Vec<Product>>,
    configurations: RwLock<HashMap<String, ConfigEntry>>,
    ledger: RwLock<Ledger>,
}

impl InMemoryLocalStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn users(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        let mut listed: Vec<User> = users.values().cloned().collect();
        listed.sort_by_key(|user| user.id);
        Ok(listed)
    }

    async fn user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.login == login)
            .cloned())
    }

    async fn upsert_user(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write().await;
        let now = Utc::now();
        let mut row = user.clone();
        row.updated_at = now;
        row.created_at = users
            .get(&user.id)
            .map_or(now, |existing| existing.created_at);
        users.insert(row.id, row);
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.users.write().await.remove(&id);
        Ok(())
    }

    async fn groups(&self) -> AppResult<Vec<Group>> {
        let groups = self.groups.read().await;
        let mut listed: Vec<Group> = groups.values().cloned().collect();
        listed.sort_by_key(|group| group.id);
        Ok(listed)
    }

    async fn group(&self, id: i64) -> AppResult<Option<Group>> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn upsert_group(&self, group: &Group) -> AppResult<()> {
        let mut groups = self.groups.write().await;
        let now = Utc::now();
        let mut row = group.clone();
        row.updated_at = now;
        row.created_at = groups
            .get(&group.id)
            .map_or(now, |existing| existing.created_at);
        groups.insert(row.id, row);
        Ok(())
    }

    async fn delete_group(&self, id: i64) -> AppResult<()> {
        self.groups.write().await.remove(&id);
        Ok(())
    }

    async fn permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.read().await.values().cloned().collect())
    }

    async fn permissions_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .filter(|permission| permission.module == module)
            .cloned()
            .collect())
    }

    async fn insert_permissions(&self, rows: &[Permission]) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;
        for row in rows {
            permissions
                .entry(row.name.clone())
                .or_insert_with(|| row.clone());
        }
        Ok(())
    }

    async fn third_parties(&self) -> AppResult<Vec<ThirdParty>> {
        Ok(self.third_parties.read().await.clone())
    }

    async fn third_party(&self, id: i64) -> AppResult<Option<ThirdParty>> {
        Ok(self
            .third_parties
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn upsert_third_party(&self, row: &ThirdParty) -> AppResult<()> {
        let mut third_parties = self.third_parties.write().await;
        let now = Utc::now();
        let mut stamped = row.clone();
        stamped.updated_at = now;

        match third_parties.iter_mut().find(|held| held.id == row.id) {
            Some(existing) => {
                stamped.created_at = existing.created_at;
                *existing = stamped;
            }
            None => {
                stamped.created_at = now;
                third_parties.push(stamped);
            }
        }

        Ok(())
    }

    async fn delete_third_party(&self, id: i64) -> AppResult<()> {
        self.third_parties.write().await.retain(|row| row.id != id);
        Ok(())
    }

    async fn replace_third_parties(&self, rows: &[ThirdParty]) -> AppResult<()> {
        let now = Utc::now();
        let mut stamped = rows.to_vec();
        for row in &mut stamped {
            row.created_at = now;
            row.updated_at = now;
        }

        *self.third_parties.write().await = stamped;
        Ok(())
    }

    async fn products(&self) -> AppResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn product(&self, id: i64) -> AppResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn upsert_product(&self, row: &Product) -> AppResult<()> {
        let mut products = self.products.write().await;
        let now = Utc::now();
        let mut stamped = row.clone();
        stamped.updated_at = now;

        match products.iter_mut().find(|held| held.id == row.id) {
            Some(existing) => {
                stamped.created_at = existing.created_at;
                *existing = stamped;
            }
            None => {
                stamped.created_at = now;
                products.push(stamped);
            }
        }

        Ok(())
    }

    async fn delete_product(&self, id: i64) -> AppResult<()> {
        self.products.write().await.retain(|row| row.id != id);
        Ok(())
    }

    async fn replace_products(&self, rows: &[Product]) -> AppResult<()> {
        let now = Utc::now();
        let mut stamped = rows.to_vec();
        for row in &mut stamped {
            row.created_at = now;
            row.updated_at = now;
        }

        *self.products.write().await = stamped;
        Ok(())
    }

    async fn configuration(&self, key: &str) -> AppResult<Option<ConfigEntry>> {
        Ok(self.configurations.read().await.get(key).cloned())
    }

    async fn configurations(&self) -> AppResult<Vec<ConfigEntry>> {
        let configurations = self.configurations.read().await;
        let mut listed: Vec<ConfigEntry> = configurations.values().cloned().collect();
        listed.sort_by(|left, right| left.key.cmp(&right.key));
        Ok(listed)
    }

    async fn set_configuration(
        &self,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        description: Option<&str>,
    ) -> AppResult<()> {
        let mut configurations = self.configurations.write().await;
        let now = Utc::now();

        match configurations.get_mut(key) {
            Some(entry) => {
                entry.value = value.to_owned();
                entry.value_type = value_type;
                entry.description = description.map(str::to_owned);
                entry.updated_at = now;
            }
            None => {
                configurations.insert(
                    key.to_owned(),
                    ConfigEntry {
                        key: key.to_owned(),
                        value: value.to_owned(),
                        value_type,
                        description: description.map(str::to_owned),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }

        Ok(())
    }

    async fn delete_configuration(&self, key: &str) -> AppResult<()> {
        self.configurations.write().await.remove(key);
        Ok(())
    }

    async fn append_ledger_entry(&self, entry: &NewLedgerEntry) -> AppResult<i64> {
        let mut ledger = self.ledger.write().await;
        ledger.next_id += 1;
        let id = ledger.next_id;

        ledger.entries.push(SyncLedgerEntry {
            id,
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            action: entry.action,
            payload: entry.payload.clone(),
            synced: false,
            created_at: Utc::now(),
            synced_at: None,
        });

        Ok(id)
    }

    async fn pending_ledger_entries(&self) -> AppResult<Vec<SyncLedgerEntry>> {
        Ok(self
            .ledger
            .read()
            .await
            .entries
            .iter()
            .filter(|entry| !entry.synced)
            .cloned()
            .collect())
    }

    async fn mark_ledger_entry_synced(&self, id: i64) -> AppResult<()> {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| AppError::NotFound(format!("ledger entry {id}")))?;

        entry.synced = true;
        entry.synced_at = Some(Utc::now());
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        // Take every write lock before clearing anything so readers see
        // either the full store or the empty one.
        let mut users = self.users.write().await;
        let mut groups = self.groups.write().await;
        let mut permissions = self.permissions.write().await;
        let mut third_parties = self.third_parties.write().await;
        let mut products = self.products.write().await;
        let mut configurations = self.configurations.write().await;
        let mut ledger = self.ledger.write().await;

        users.clear();
        groups.clear();
        permissions.clear();
        third_parties.clear();
        products.clear();
        configurations.clear();
        *ledger = Ledger::default();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use dolimirror_application::{LocalStore, seed_defaults};
    use dolimirror_domain::{LedgerAction, NewLedgerEntry, ThirdPartyStatus, User};

    use super::InMemoryLocalStore;

    fn third_party(id: i64, name: &str) -> dolimirror_domain::ThirdParty {
        let now = Utc::now();
        dolimirror_domain::ThirdParty {
            id,
            name: name.to_owned(),
            name_alias: None,
            address: None,
            zip: None,
            town: None,
            state: None,
            country: None,
            phone: None,
            email: None,
            website: None,
            client: false,
            supplier: false,
            prospect: false,
            status: ThirdPartyStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
            last_contact: None,
        }
    }

    #[tokio::test]
    async fn upsert_preserves_created_at_and_restamps_updated_at() {
        let store = InMemoryLocalStore::new();
        let user = User::bootstrap_admin(Utc::now());

        assert!(store.upsert_user(&user).await.is_ok());
        let Some(first) = store.user(user.id).await.ok().flatten() else {
            panic!("user missing after upsert");
        };

        let mut renamed = first.clone();
        renamed.firstname = "Root".to_owned();
        assert!(store.upsert_user(&renamed).await.is_ok());

        let Some(second) = store.user(user.id).await.ok().flatten() else {
            panic!("user missing after second upsert");
        };
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.firstname, "Root");
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_mirror() {
        let store = InMemoryLocalStore::new();

        let seeded = store
            .replace_third_parties(&[third_party(1, "Stale")])
            .await;
        assert!(seeded.is_ok());

        let replaced = store
            .replace_third_parties(&[third_party(2, "Acme"), third_party(3, "Globex")])
            .await;
        assert!(replaced.is_ok());

        let ids: Vec<i64> = store
            .third_parties()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn per_row_mirror_writes_merge_by_id() {
        let store = InMemoryLocalStore::new();

        assert!(store.upsert_third_party(&third_party(1, "Acme")).await.is_ok());
        assert!(store
            .upsert_third_party(&third_party(1, "Acme Renamed"))
            .await
            .is_ok());

        let rows = store.third_parties().await.unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Acme Renamed");

        assert!(store.delete_third_party(1).await.is_ok());
        assert!(store.third_parties().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryLocalStore::new();

        assert!(seed_defaults(&store).await.is_ok());
        let users = store.users().await.unwrap_or_default();
        let permissions = store.permissions().await.unwrap_or_default();
        assert_eq!(users.len(), 1);
        assert_eq!(permissions.len(), 9);

        assert!(seed_defaults(&store).await.is_ok());
        assert_eq!(store.users().await.unwrap_or_default().len(), 1);
        assert_eq!(store.permissions().await.unwrap_or_default().len(), 9);
    }

    #[tokio::test]
    async fn seeding_skips_non_empty_collections() {
        let store = InMemoryLocalStore::new();
        let mut existing = User::bootstrap_admin(Utc::now());
        existing.id = 42;
        existing.login = "someone".to_owned();
        assert!(store.upsert_user(&existing).await.is_ok());

        assert!(seed_defaults(&store).await.is_ok());

        let users = store.users().await.unwrap_or_default();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].login, "someone");
    }

    #[tokio::test]
    async fn ledger_marks_entries_synced_with_a_timestamp() {
        let store = InMemoryLocalStore::new();

        let id = store
            .append_ledger_entry(&NewLedgerEntry {
                entity_type: "products".to_owned(),
                entity_id: 5,
                action: LedgerAction::Create,
                payload: json!({"label": "Widget"}),
            })
            .await;
        let Ok(id) = id else {
            panic!("append failed");
        };

        assert_eq!(store.pending_ledger_entries().await.unwrap_or_default().len(), 1);
        assert!(store.mark_ledger_entry_synced(id).await.is_ok());
        assert!(store.pending_ledger_entries().await.unwrap_or_default().is_empty());
        assert!(store.mark_ledger_entry_synced(9999).await.is_err());
    }

    #[tokio::test]
    async fn clear_all_empties_every_collection() {
        let store = InMemoryLocalStore::new();
        assert!(seed_defaults(&store).await.is_ok());
        assert!(store
            .replace_third_parties(&[third_party(1, "Acme")])
            .await
            .is_ok());

        assert!(store.clear_all().await.is_ok());

        assert!(store.users().await.unwrap_or_default().is_empty());
        assert!(store.permissions().await.unwrap_or_default().is_empty());
        assert!(store.third_parties().await.unwrap_or_default().is_empty());
    }
}
