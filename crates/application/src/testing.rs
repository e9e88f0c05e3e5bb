//! Fake port implementations shared by the service test modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{
    ConfigEntry, ConfigValueType, Group, NewLedgerEntry, Permission, Product, Rights,
    SyncLedgerEntry, ThirdParty, ThirdPartyStatus, User,
};

use crate::{
    ConnectivityMonitor, ConnectivityProbe, LocalStore, LoginSuccess, RemoteGateway, RemoteGroup,
    RemoteUser,
};

#[derive(Default)]
struct MemoryData {
    users: Vec<User>,
    groups: Vec<Group>,
    permissions: Vec<Permission>,
    third_parties: Vec<ThirdParty>,
    products: Vec<Product>,
    configurations: Vec<ConfigEntry>,
    ledger: Vec<SyncLedgerEntry>,
    next_ledger_id: i64,
}

/// Simple in-memory [`LocalStore`] fake for service tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn users(&self) -> AppResult<Vec<User>> {
        Ok(self.data.lock().await.users.clone())
    }

    async fn user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self
            .data
            .lock()
            .await
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        Ok(self
            .data
            .lock()
            .await
            .users
            .iter()
            .find(|user| user.login == login)
            .cloned())
    }

    async fn upsert_user(&self, user: &User) -> AppResult<()> {
        let mut data = self.data.lock().await;
        let now = Utc::now();
        let mut row = user.clone();
        row.updated_at = now;

        if let Some(existing) = data.users.iter_mut().find(|held| held.id == user.id) {
            row.created_at = existing.created_at;
            *existing = row;
        } else {
            row.created_at = now;
            data.users.push(row);
        }

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.data.lock().await.users.retain(|user| user.id != id);
        Ok(())
    }

    async fn groups(&self) -> AppResult<Vec<Group>> {
        Ok(self.data.lock().await.groups.clone())
    }

    async fn group(&self, id: i64) -> AppResult<Option<Group>> {
        Ok(self
            .data
            .lock()
            .await
            .groups
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn upsert_group(&self, group: &Group) -> AppResult<()> {
        let mut data = self.data.lock().await;
        let now = Utc::now();
        let mut row = group.clone();
        row.updated_at = now;

        if let Some(existing) = data.groups.iter_mut().find(|held| held.id == group.id) {
            row.created_at = existing.created_at;
            *existing = row;
        } else {
            row.created_at = now;
            data.groups.push(row);
        }

        Ok(())
    }

    async fn delete_group(&self, id: i64) -> AppResult<()> {
        self.data.lock().await.groups.retain(|group| group.id != id);
        Ok(())
    }

    async fn permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.data.lock().await.permissions.clone())
    }

    async fn permissions_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        Ok(self
            .data
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| permission.module == module)
            .cloned()
            .collect())
    }

    async fn insert_permissions(&self, rows: &[Permission]) -> AppResult<()> {
        let mut data = self.data.lock().await;
        for row in rows {
            if !data.permissions.iter().any(|held| held.name == row.name) {
                data.permissions.push(row.clone());
            }
        }

        Ok(())
    }

    async fn third_parties(&self) -> AppResult<Vec<ThirdParty>> {
        Ok(self.data.lock().await.third_parties.clone())
    }

    async fn third_party(&self, id: i64) -> AppResult<Option<ThirdParty>> {
        Ok(self
            .data
            .lock()
            .await
            .third_parties
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn upsert_third_party(&self, row: &ThirdParty) -> AppResult<()> {
        let mut data = self.data.lock().await;
        match data.third_parties.iter_mut().find(|held| held.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => data.third_parties.push(row.clone()),
        }
        Ok(())
    }

    async fn delete_third_party(&self, id: i64) -> AppResult<()> {
        self.data.lock().await.third_parties.retain(|row| row.id != id);
        Ok(())
    }

    async fn replace_third_parties(&self, rows: &[ThirdParty]) -> AppResult<()> {
        self.data.lock().await.third_parties = rows.to_vec();
        Ok(())
    }

    async fn products(&self) -> AppResult<Vec<Product>> {
        Ok(self.data.lock().await.products.clone())
    }

    async fn product(&self, id: i64) -> AppResult<Option<Product>> {
        Ok(self
            .data
            .lock()
            .await
            .products
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn upsert_product(&self, row: &Product) -> AppResult<()> {
        let mut data = self.data.lock().await;
        match data.products.iter_mut().find(|held| held.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => data.products.push(row.clone()),
        }
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> AppResult<()> {
        self.data.lock().await.products.retain(|row| row.id != id);
        Ok(())
    }

    async fn replace_products(&self, rows: &[Product]) -> AppResult<()> {
        self.data.lock().await.products = rows.to_vec();
        Ok(())
    }

    async fn configuration(&self, key: &str) -> AppResult<Option<ConfigEntry>> {
        Ok(self
            .data
            .lock()
            .await
            .configurations
            .iter()
            .find(|entry| entry.key == key)
            .cloned())
    }

    async fn configurations(&self) -> AppResult<Vec<ConfigEntry>> {
        Ok(self.data.lock().await.configurations.clone())
    }

    async fn set_configuration(
        &self,
        key: &str,
        value: &str,
        value_type: ConfigValueType,
        description: Option<&str>,
    ) -> AppResult<()> {
        let mut data = self.data.lock().await;
        let now = Utc::now();

        if let Some(existing) = data.configurations.iter_mut().find(|entry| entry.key == key) {
            existing.value = value.to_owned();
            existing.value_type = value_type;
            existing.description = description.map(str::to_owned);
            existing.updated_at = now;
        } else {
            data.configurations.push(ConfigEntry {
                key: key.to_owned(),
                value: value.to_owned(),
                value_type,
                description: description.map(str::to_owned),
                created_at: now,
                updated_at: now,
            });
        }

        Ok(())
    }

    async fn delete_configuration(&self, key: &str) -> AppResult<()> {
        self.data
            .lock()
            .await
            .configurations
            .retain(|entry| entry.key != key);
        Ok(())
    }

    async fn append_ledger_entry(&self, entry: &NewLedgerEntry) -> AppResult<i64> {
        let mut data = self.data.lock().await;
        data.next_ledger_id += 1;
        let id = data.next_ledger_id;

        data.ledger.push(SyncLedgerEntry {
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
            .data
            .lock()
            .await
            .ledger
            .iter()
            .filter(|entry| !entry.synced)
            .cloned()
            .collect())
    }

    async fn mark_ledger_entry_synced(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.lock().await;
        let entry = data
            .ledger
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| AppError::NotFound(format!("ledger entry {id}")))?;

        entry.synced = true;
        entry.synced_at = Some(Utc::now());
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        *self.data.lock().await = MemoryData::default();
        Ok(())
    }
}

/// Configurable [`RemoteGateway`] fake.
pub struct FakeGateway {
    pub token: String,
    pub login_user: Option<RemoteUser>,
    pub user_info: Option<RemoteUser>,
    pub fail_login: bool,
    pub introspect_ok: bool,
    pub users: Vec<RemoteUser>,
    pub groups: Vec<RemoteGroup>,
    pub third_parties: Vec<ThirdParty>,
    pub products: Vec<Product>,
    pub fail_fetches: bool,
    pub login_delay: Option<Duration>,
    pub logout_calls: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            token: "T1".to_owned(),
            login_user: None,
            user_info: None,
            fail_login: false,
            introspect_ok: true,
            users: Vec::new(),
            groups: Vec::new(),
            third_parties: Vec::new(),
            products: Vec::new(),
            fail_fetches: false,
            login_delay: None,
            logout_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeGateway {
    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn login(&self, _login: &str, _password: &str) -> AppResult<LoginSuccess> {
        if let Some(delay) = self.login_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_login {
            return Err(AppError::Credential("login failed".to_owned()));
        }

        Ok(LoginSuccess {
            token: self.token.clone(),
            user: self.login_user.clone(),
        })
    }

    async fn introspect(&self, _token: &str) -> AppResult<()> {
        if self.introspect_ok {
            Ok(())
        } else {
            Err(AppError::Credential("token invalid".to_owned()))
        }
    }

    async fn user_info(&self, _token: &str) -> AppResult<RemoteUser> {
        self.user_info.clone().ok_or_else(|| AppError::RemoteStatus {
            status: 500,
            message: "user info unavailable".to_owned(),
        })
    }

    async fn fetch_users(&self, _token: &str) -> AppResult<Vec<RemoteUser>> {
        if self.fail_fetches {
            return Err(AppError::Transport("connection refused".to_owned()));
        }

        Ok(self.users.clone())
    }

    async fn fetch_groups(&self, _token: &str) -> AppResult<Vec<RemoteGroup>> {
        if self.fail_fetches {
            return Err(AppError::Transport("connection refused".to_owned()));
        }

        Ok(self.groups.clone())
    }

    async fn fetch_third_parties(&self, _token: &str) -> AppResult<Vec<ThirdParty>> {
        if self.fail_fetches {
            return Err(AppError::Transport("connection refused".to_owned()));
        }

        Ok(self.third_parties.clone())
    }

    async fn fetch_products(&self, _token: &str) -> AppResult<Vec<Product>> {
        if self.fail_fetches {
            return Err(AppError::Transport("connection refused".to_owned()));
        }

        Ok(self.products.clone())
    }

    async fn logout(&self, _token: &str) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn test_connection(&self) -> AppResult<()> {
        if self.fail_fetches {
            return Err(AppError::Transport("connection refused".to_owned()));
        }

        Ok(())
    }
}

enum ProbeBehavior {
    Online,
    Offline,
    Failing,
}

/// Probe fake with a fixed answer.
pub struct StaticProbe {
    behavior: ProbeBehavior,
}

impl StaticProbe {
    pub fn online() -> Self {
        Self {
            behavior: ProbeBehavior::Online,
        }
    }

    pub fn offline() -> Self {
        Self {
            behavior: ProbeBehavior::Offline,
        }
    }

    pub fn failing() -> Self {
        Self {
            behavior: ProbeBehavior::Failing,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn check(&self) -> AppResult<bool> {
        match self.behavior {
            ProbeBehavior::Online => Ok(true),
            ProbeBehavior::Offline => Ok(false),
            ProbeBehavior::Failing => Err(AppError::Transport("probe unreachable".to_owned())),
        }
    }
}

/// Builds a monitor pinned to the given reachability.
pub async fn monitor_with_state(online: bool) -> ConnectivityMonitor {
    let probe = if online {
        StaticProbe::online()
    } else {
        StaticProbe::offline()
    };

    let monitor = ConnectivityMonitor::new(Arc::new(probe));
    monitor.set_online(online).await;
    monitor
}

/// Builds a remote user payload for tests.
pub fn remote_user(id: i64, login: &str, admin: bool) -> RemoteUser {
    RemoteUser {
        id,
        login: login.to_owned(),
        firstname: "Test".to_owned(),
        lastname: "User".to_owned(),
        email: format!("{login}@example.com"),
        admin,
        active: true,
        groups: Vec::new(),
        permissions: Vec::new(),
        rights: Rights::new(),
    }
}

/// Builds a third-party mirror row for tests.
pub fn third_party(id: i64, name: &str) -> ThirdParty {
    let now = Utc::now();
    ThirdParty {
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
