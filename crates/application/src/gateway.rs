//! Remote API port: login, token introspection, and entity listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dolimirror_core::AppResult;
use dolimirror_domain::{Group, Product, Rights, ThirdParty, User};

/// Successful credential exchange with the remote backend.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// Opaque bearer credential for subsequent remote calls.
    pub token: String,
    /// User data embedded in the login reply, when the backend sends it.
    pub user: Option<RemoteUser>,
}

/// User payload as validated at the gateway boundary.
///
/// The `rights` object arrives structurally untyped from the remote
/// user-info endpoint and is parsed into [`Rights`] before it crosses
/// into the session layer.
#[derive(Debug, Clone)]
pub struct RemoteUser {
    /// Remote backend identifier.
    pub id: i64,
    /// Login name.
    pub login: String,
    /// First name.
    pub firstname: String,
    /// Last name.
    pub lastname: String,
    /// Email address.
    pub email: String,
    /// Backend admin flag.
    pub admin: bool,
    /// Backend active flag.
    pub active: bool,
    /// Identifiers of the user's groups.
    pub groups: Vec<i64>,
    /// Permission names granted directly.
    pub permissions: Vec<String>,
    /// Validated per-module rights.
    pub rights: Rights,
}

impl RemoteUser {
    /// Converts the boundary payload into a local mirror row.
    #[must_use]
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: self.id,
            login: self.login,
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            admin: self.admin,
            active: self.active,
            groups: self.groups,
            permissions: self.permissions,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Group payload as validated at the gateway boundary.
#[derive(Debug, Clone)]
pub struct RemoteGroup {
    /// Remote backend identifier.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Permission names granted through the group.
    pub permissions: Vec<String>,
}

impl RemoteGroup {
    /// Converts the boundary payload into a local mirror row.
    #[must_use]
    pub fn into_group(self, now: DateTime<Utc>) -> Group {
        Group {
            id: self.id,
            name: self.name,
            description: self.description,
            permissions: self.permissions,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stateless HTTP client port for the remote business backend.
///
/// Every operation resolves the base endpoint from configuration per
/// call and fails distinctly on transport errors, non-success statuses,
/// and malformed payloads. The one exception is `logout`, which is
/// best-effort.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, login: &str, password: &str) -> AppResult<LoginSuccess>;

    /// Verifies that a token is still usable.
    async fn introspect(&self, token: &str) -> AppResult<()>;

    /// Fetches the authenticated user's full info, rights included.
    async fn user_info(&self, token: &str) -> AppResult<RemoteUser>;

    /// Lists all users. No pagination; the full collection is returned.
    async fn fetch_users(&self, token: &str) -> AppResult<Vec<RemoteUser>>;

    /// Lists all groups.
    async fn fetch_groups(&self, token: &str) -> AppResult<Vec<RemoteGroup>>;

    /// Lists all third parties.
    async fn fetch_third_parties(&self, token: &str) -> AppResult<Vec<ThirdParty>>;

    /// Lists all products.
    async fn fetch_products(&self, token: &str) -> AppResult<Vec<Product>>;

    /// Invalidates the token remotely. Failures are logged, never
    /// propagated: logout must always succeed locally.
    async fn logout(&self, token: &str);

    /// Probes the remote status endpoint for reachability.
    async fn test_connection(&self) -> AppResult<()>;
}
