//! Application services and ports for the Dolimirror client core.
//!
//! Ports are async traits implemented by the infrastructure crate;
//! services own the session, connectivity, configuration, and sync state
//! machines consumed by the (excluded) presentation layer.

#![forbid(unsafe_code)]

mod auth_service;
mod config_service;
mod connectivity;
mod gateway;
mod store;
mod sync_service;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_service::{AuthService, AuthStage, AuthState, LoginCredentials};
pub use config_service::{
    BASE_URL_KEY, ConfigService, ConfigValue, REMOTE_TOKEN_KEY, SESSION_RECORD_KEY,
};
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, ConnectivityState};
pub use gateway::{LoginSuccess, RemoteGateway, RemoteGroup, RemoteUser};
pub use store::{LocalStore, seed_defaults};
pub use sync_service::{MirrorStatus, RefreshOutcome, RefreshReport, SyncCoordinator, SyncStatus};
