//! Mirror reconciliation between the remote backend and the local store.
//!
//! Every refresh decides between the remote source of truth and the local
//! mirror based on connectivity, keeps the mirror eventually consistent,
//! and records failures as observable state instead of propagating them:
//! a stale local view is still usable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{Group, NewLedgerEntry, Product, SyncLedgerEntry, ThirdParty, User};

use crate::{ConfigService, ConnectivityMonitor, LocalStore, RemoteGateway};


/// Outcome of a single entity-type refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome<T> {
    /// The resulting collection: fresh remote rows when the refresh
    /// reached the backend, the local mirror otherwise. An empty
    /// collection is a valid result, not a failure.
    pub items: Vec<T>,
    /// Connectivity as observed when the refresh started.
    pub is_online: bool,
    /// When this entity type last reconciled with the backend.
    pub last_sync: Option<DateTime<Utc>>,
    /// Advisory message when the refresh fell back to the mirror because
    /// of a failure. Unset when offline: offline is not itself an error.
    pub error: Option<String>,
}

/// Last-sync bookkeeping for one entity type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorStatus {
    /// When the mirror last reconciled with the backend.
    pub last_sync: Option<DateTime<Utc>>,
    /// Message of the last failed refresh, if any.
    pub error: Option<String>,
}

/// Combined outcome of [`SyncCoordinator::refresh_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// User mirror outcome.
    pub users: RefreshOutcome<User>,
    /// Group mirror outcome.
    pub groups: RefreshOutcome<Group>,
    /// Third-party mirror outcome.
    pub third_parties: RefreshOutcome<ThirdParty>,
    /// Product mirror outcome.
    pub products: RefreshOutcome<Product>,
}

/// Summary of the pending-mutation ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Number of mutations awaiting remote acknowledgement.
    pub pending_count: usize,
    /// Whether any mutation is pending.
    pub has_pending: bool,
    /// When the most recent pending mutation was recorded.
    pub last_entry_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct SyncSlots {
    users: MirrorStatus,
    groups: MirrorStatus,
    third_parties: MirrorStatus,
    products: MirrorStatus,
}

struct CoordinatorInner {
    slots: RwLock<SyncSlots>,
    users_lock: Mutex<()>,
    groups_lock: Mutex<()>,
    third_parties_lock: Mutex<()>,
    products_lock: Mutex<()>,
}

/// Reconciles local mirror collections with the remote backend.
///
/// Refreshes are idempotent and safe to call concurrently: mirror
/// replacement is serialized per entity type, so an interleaved second
/// call cannot produce an inconsistent mirror.
#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    config: ConfigService,
    connectivity: ConnectivityMonitor,
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    /// Creates a coordinator over the store, gateway, and connectivity
    /// monitor.
    #[must_use]
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        config: ConfigService,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            connectivity,
            inner: Arc::new(CoordinatorInner {
                slots: RwLock::new(SyncSlots::default()),
                users_lock: Mutex::new(()),
                groups_lock: Mutex::new(()),
                third_parties_lock: Mutex::new(()),
                products_lock: Mutex::new(()),
            }),
        }
    }

    /// Refreshes the third-party mirror.
    pub async fn refresh_third_parties(&self) -> AppResult<RefreshOutcome<ThirdParty>> {
        let is_online = self.connectivity.is_online();

        if is_online {
            match self.pull_third_parties().await {
                Ok(rows) => {
                    let last_sync = self
                        .record_success(|slots| &mut slots.third_parties, rows.len(), "third_parties")
                        .await;
                    return Ok(RefreshOutcome {
                        items: rows,
                        is_online,
                        last_sync: Some(last_sync),
                        error: None,
                    });
                }
                Err(error) => {
                    self.record_failure(|slots| &mut slots.third_parties, &error, "third_parties")
                        .await;
                }
            }
        }

        let items = self.store.third_parties().await?;
        let status = self.inner.slots.read().await.third_parties.clone();
        Ok(fallback_outcome(items, is_online, status))
    }

    /// Refreshes the product mirror.
    pub async fn refresh_products(&self) -> AppResult<RefreshOutcome<Product>> {
        let is_online = self.connectivity.is_online();

        if is_online {
            match self.pull_products().await {
                Ok(rows) => {
                    let last_sync = self
                        .record_success(|slots| &mut slots.products, rows.len(), "products")
                        .await;
                    return Ok(RefreshOutcome {
                        items: rows,
                        is_online,
                        last_sync: Some(last_sync),
                        error: None,
                    });
                }
                Err(error) => {
                    self.record_failure(|slots| &mut slots.products, &error, "products")
                        .await;
                }
            }
        }

        let items = self.store.products().await?;
        let status = self.inner.slots.read().await.products.clone();
        Ok(fallback_outcome(items, is_online, status))
    }

    /// Refreshes the user mirror. Unlike the snapshot mirrors, user rows
    /// are merged by id: the session layer co-owns this collection.
    pub async fn refresh_users(&self) -> AppResult<RefreshOutcome<User>> {
        let is_online = self.connectivity.is_online();

        if is_online {
            match self.pull_users().await {
                Ok(count) => {
                    let last_sync = self
                        .record_success(|slots| &mut slots.users, count, "users")
                        .await;
                    return Ok(RefreshOutcome {
                        items: self.store.users().await?,
                        is_online,
                        last_sync: Some(last_sync),
                        error: None,
                    });
                }
                Err(error) => {
                    self.record_failure(|slots| &mut slots.users, &error, "users")
                        .await;
                }
            }
        }

        let items = self.store.users().await?;
        let status = self.inner.slots.read().await.users.clone();
        Ok(fallback_outcome(items, is_online, status))
    }

    /// Refreshes the group mirror, merged by id like users.
    pub async fn refresh_groups(&self) -> AppResult<RefreshOutcome<Group>> {
        let is_online = self.connectivity.is_online();

        if is_online {
            match self.pull_groups().await {
                Ok(count) => {
                    let last_sync = self
                        .record_success(|slots| &mut slots.groups, count, "groups")
                        .await;
                    return Ok(RefreshOutcome {
                        items: self.store.groups().await?,
                        is_online,
                        last_sync: Some(last_sync),
                        error: None,
                    });
                }
                Err(error) => {
                    self.record_failure(|slots| &mut slots.groups, &error, "groups")
                        .await;
                }
            }
        }

        let items = self.store.groups().await?;
        let status = self.inner.slots.read().await.groups.clone();
        Ok(fallback_outcome(items, is_online, status))
    }

    /// Refreshes every mirror. Entity types reconcile independently; no
    /// cross-type ordering is guaranteed or required.
    pub async fn refresh_all(&self) -> AppResult<RefreshReport> {
        let (users, groups, third_parties, products) = tokio::join!(
            self.refresh_users(),
            self.refresh_groups(),
            self.refresh_third_parties(),
            self.refresh_products(),
        );

        Ok(RefreshReport {
            users: users?,
            groups: groups?,
            third_parties: third_parties?,
            products: products?,
        })
    }

    /// Records a locally-originated mutation in the pending ledger.
    ///
    /// The ledger is append-only audit data for writes made while
    /// offline; no replay is derived from it.
    pub async fn record_local_mutation(&self, entry: NewLedgerEntry) -> AppResult<i64> {
        self.store.append_ledger_entry(&entry).await
    }

    /// Lists mutations still awaiting remote acknowledgement.
    pub async fn pending_mutations(&self) -> AppResult<Vec<SyncLedgerEntry>> {
        self.store.pending_ledger_entries().await
    }

    /// Flags a pending mutation as acknowledged.
    pub async fn mark_mutation_synced(&self, id: i64) -> AppResult<()> {
        self.store.mark_ledger_entry_synced(id).await
    }

    /// Summarizes the pending-mutation ledger.
    pub async fn sync_status(&self) -> AppResult<SyncStatus> {
        let pending = self.store.pending_ledger_entries().await?;

        Ok(SyncStatus {
            pending_count: pending.len(),
            has_pending: !pending.is_empty(),
            last_entry_at: pending.iter().map(|entry| entry.created_at).max(),
        })
    }

    /// Returns the last-sync bookkeeping for the third-party mirror.
    pub async fn third_parties_status(&self) -> MirrorStatus {
        self.inner.slots.read().await.third_parties.clone()
    }

    /// Returns the last-sync bookkeeping for the product mirror.
    pub async fn products_status(&self) -> MirrorStatus {
        self.inner.slots.read().await.products.clone()
    }

    /// Returns the last-sync bookkeeping for the user mirror.
    pub async fn users_status(&self) -> MirrorStatus {
        self.inner.slots.read().await.users.clone()
    }

    /// Returns the last-sync bookkeeping for the group mirror.
    pub async fn groups_status(&self) -> MirrorStatus {
        self.inner.slots.read().await.groups.clone()
    }

    async fn pull_third_parties(&self) -> AppResult<Vec<ThirdParty>> {
        let token = self.credential().await?;
        let rows = self.gateway.fetch_third_parties(&token).await?;

        let _guard = self.inner.third_parties_lock.lock().await;
        self.store.replace_third_parties(&rows).await?;

        Ok(rows)
    }

    async fn pull_products(&self) -> AppResult<Vec<Product>> {
        let token = self.credential().await?;
        let rows = self.gateway.fetch_products(&token).await?;

        let _guard = self.inner.products_lock.lock().await;
        self.store.replace_products(&rows).await?;

        Ok(rows)
    }

    async fn pull_users(&self) -> AppResult<usize> {
        let token = self.credential().await?;
        let fetched = self.gateway.fetch_users(&token).await?;
        let now = Utc::now();

        let _guard = self.inner.users_lock.lock().await;
        let mut count = 0_usize;
        for remote in fetched {
            self.store.upsert_user(&remote.into_user(now)).await?;
            count += 1;
        }

        Ok(count)
    }

    async fn pull_groups(&self) -> AppResult<usize> {
        let token = self.credential().await?;
        let fetched = self.gateway.fetch_groups(&token).await?;
        let now = Utc::now();

        let _guard = self.inner.groups_lock.lock().await;
        let mut count = 0_usize;
        for remote in fetched {
            self.store.upsert_group(&remote.into_group(now)).await?;
            count += 1;
        }

        Ok(count)
    }

    async fn credential(&self) -> AppResult<String> {
        self.config
            .remote_token()
            .await?
            .ok_or_else(|| AppError::Credential("no remote credential available".to_owned()))
    }

    async fn record_success<F>(&self, slot: F, count: usize, entity: &str) -> DateTime<Utc>
    where
        F: FnOnce(&mut SyncSlots) -> &mut MirrorStatus,
    {
        let now = Utc::now();
        info!(entity, count, "mirror refreshed from remote");

        let mut slots = self.inner.slots.write().await;
        let status = slot(&mut slots);
        status.last_sync = Some(now);
        status.error = None;

        now
    }

    async fn record_failure<F>(&self, slot: F, error: &AppError, entity: &str)
    where
        F: FnOnce(&mut SyncSlots) -> &mut MirrorStatus,
    {
        warn!(entity, %error, "remote refresh failed, serving local mirror");

        let mut slots = self.inner.slots.write().await;
        slot(&mut slots).error = Some(error.to_string());
    }
}

fn fallback_outcome<T>(items: Vec<T>, is_online: bool, status: MirrorStatus) -> RefreshOutcome<T> {
    RefreshOutcome {
        items,
        is_online,
        last_sync: status.last_sync,
        // Offline fallback is the normal offline path, not a failure.
        error: if is_online { status.error } else { None },
    }
}
