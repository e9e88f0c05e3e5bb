//! The authentication/session state machine.
//!
//! Owns credential exchange, startup hydration, permission/rights
//! derivation, session persistence, and teardown. Exactly one session
//! exists per running client; every other subsystem reads its derived
//! state through this service.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{
    Rights, User, accessible_modules, derive_permission_names, module_access_granted,
};

use crate::{
    ConfigService, ConfigValue, LocalStore, REMOTE_TOKEN_KEY, RemoteGateway, SESSION_RECORD_KEY,
};


/// Where the session state machine currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    /// No session is established.
    LoggedOut,
    /// A credential exchange is in flight.
    Authenticating,
    /// A session is established.
    Authenticated,
    /// The last login attempt failed; a new login recovers from this.
    Failed(String),
}

/// The single process-wide session state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    /// Current state-machine stage.
    pub stage: AuthStage,
    /// Authenticated user, present iff the stage is `Authenticated`.
    pub user: Option<User>,
    /// Local session marker, present iff the stage is `Authenticated`.
    pub session_token: Option<String>,
    /// Derived effective permission names.
    pub permissions: Vec<String>,
    /// Per-module rights fetched with the user info.
    pub rights: Rights,
    /// Whether a login is currently in flight.
    pub is_loading: bool,
    /// Message of the last failure, if any.
    pub error: Option<String>,
}

impl AuthState {
    fn logged_out() -> Self {
        Self {
            stage: AuthStage::LoggedOut,
            user: None,
            session_token: None,
            permissions: Vec::new(),
            rights: Rights::new(),
            is_loading: false,
            error: None,
        }
    }

    /// Returns whether an authenticated session is established.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.stage == AuthStage::Authenticated
    }
}

/// Login form input.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    /// Login name.
    pub login: String,
    /// Plaintext password, forwarded to the remote backend only.
    pub password: String,
}

/// Session data persisted across process restarts.
///
/// Written on login under the `session_record` configuration key and read
/// back during startup hydration once the stored remote credential has
/// been re-validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    token: String,
    user: User,
    rights: Rights,
}

/// Authentication service: state machine, persistence, and permission
/// queries.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    config: ConfigService,
    state: Arc<RwLock<AuthState>>,
}

impl AuthService {
    /// Creates the session service. The state starts `LoggedOut`; call
    /// [`AuthService::initialize`] to hydrate a surviving session.
    #[must_use]
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        config: ConfigService,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            state: Arc::new(RwLock::new(AuthState::logged_out())),
        }
    }

    /// Attempts to re-establish a session from a stored credential.
    ///
    /// A stored credential that fails introspection is discarded. A valid
    /// credential without a readable session record cannot re-establish a
    /// user identity, so the state remains `LoggedOut`. Returns whether a
    /// session was established.
    pub async fn initialize(&self) -> AppResult<bool> {
        let Some(token) = self.config.remote_token().await? else {
            return Ok(false);
        };

        if let Err(error) = self.gateway.introspect(&token).await {
            warn!(%error, "stored credential is no longer valid, discarding");
            self.clear_auth_data().await;
            return Ok(false);
        }

        let Some(record) = self.load_session_record().await? else {
            debug!("valid credential without a session record, staying logged out");
            return Ok(false);
        };

        let permissions = self.derive_for(&record.user).await?;

        let mut state = self.state.write().await;
        *state = AuthState {
            stage: AuthStage::Authenticated,
            user: Some(record.user),
            session_token: Some(record.token),
            permissions,
            rights: record.rights,
            is_loading: false,
            error: None,
        };

        Ok(true)
    }

    /// Exchanges credentials for a session.
    ///
    /// This is the one operation that propagates its failure to the
    /// caller: login failure is user-actionable. The failure is also
    /// recorded in the state as `Failed`, from which a later login
    /// recovers. A second call while one is already authenticating is
    /// rejected without touching the stored credential.
    pub async fn login(&self, credentials: &LoginCredentials) -> AppResult<User> {
        {
            let mut state = self.state.write().await;
            if state.stage == AuthStage::Authenticating {
                return Err(AppError::Conflict(
                    "a login attempt is already in progress".to_owned(),
                ));
            }

            *state = AuthState {
                stage: AuthStage::Authenticating,
                is_loading: true,
                ..AuthState::logged_out()
            };
        }

        match self.perform_login(credentials).await {
            Ok(user) => Ok(user),
            Err(error) => {
                let message = error.to_string();
                let mut state = self.state.write().await;
                *state = AuthState {
                    stage: AuthStage::Failed(message.clone()),
                    error: Some(message),
                    ..AuthState::logged_out()
                };
                drop(state);

                Err(error)
            }
        }
    }

    async fn perform_login(&self, credentials: &LoginCredentials) -> AppResult<User> {
        let grant = self
            .gateway
            .login(&credentials.login, &credentials.password)
            .await?;

        self.config
            .set(
                REMOTE_TOKEN_KEY,
                &ConfigValue::Text(grant.token.clone()),
                Some("Remote API token"),
            )
            .await?;

        // Prefer the full user-info payload; the login reply's embedded
        // user is the fallback when the info endpoint is unavailable.
        let remote_user = match self.gateway.user_info(&grant.token).await {
            Ok(user) => user,
            Err(error) => match grant.user {
                Some(user) => user,
                None => return Err(error),
            },
        };

        let now = Utc::now();
        let rights = remote_user.rights.clone();
        let mut user = remote_user.into_user(now);
        user.last_login = Some(now);

        self.store.upsert_user(&user).await?;

        let permissions = self.derive_for(&user).await?;
        let marker = session_marker(&user)?;

        self.persist_session_record(&SessionRecord {
            token: marker.clone(),
            user: user.clone(),
            rights: rights.clone(),
        })
        .await?;

        let mut state = self.state.write().await;
        *state = AuthState {
            stage: AuthStage::Authenticated,
            user: Some(user.clone()),
            session_token: Some(marker),
            permissions,
            rights,
            is_loading: false,
            error: None,
        };
        drop(state);

        Ok(user)
    }

    /// Tears the session down. Never fails visibly and is idempotent:
    /// the remote logout is best-effort, local teardown always happens.
    pub async fn logout(&self) {
        match self.config.remote_token().await {
            Ok(Some(token)) => self.gateway.logout(&token).await,
            Ok(None) => {}
            Err(error) => warn!(%error, "could not read stored credential during logout"),
        }

        self.clear_auth_data().await;

        let mut state = self.state.write().await;
        *state = AuthState::logged_out();
    }

    /// Returns whether a session is established, opportunistically
    /// hydrating from a credential that survived a process restart.
    pub async fn is_user_authenticated(&self) -> bool {
        if self.state.read().await.is_authenticated() {
            return true;
        }

        match self.initialize().await {
            Ok(authenticated) => authenticated,
            Err(error) => {
                warn!(%error, "session hydration failed");
                false
            }
        }
    }

    /// Reloads the mirrored user row and re-derives permissions without
    /// touching the stored credential.
    pub async fn refresh_user_data(&self) -> AppResult<()> {
        let (user_id, marker, rights) = {
            let state = self.state.read().await;
            let Some(ref user) = state.user else {
                return Ok(());
            };
            let Some(ref marker) = state.session_token else {
                return Ok(());
            };
            (user.id, marker.clone(), state.rights.clone())
        };

        let Some(user) = self.store.user(user_id).await? else {
            return Ok(());
        };

        let permissions = self.derive_for(&user).await?;

        self.persist_session_record(&SessionRecord {
            token: marker,
            user: user.clone(),
            rights: rights.clone(),
        })
        .await?;

        let mut state = self.state.write().await;
        state.user = Some(user);
        state.permissions = permissions;
        state.rights = rights;

        Ok(())
    }

    /// Returns a snapshot of the session state.
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Returns the authenticated user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    /// Returns whether the authenticated user holds the admin flag.
    pub async fn is_admin(&self) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(|user| user.admin)
    }

    /// Returns whether the session holds a permission. Admins hold every
    /// permission implicitly.
    pub async fn has_permission(&self, name: &str) -> bool {
        let state = self.state.read().await;
        let admin = state.user.as_ref().is_some_and(|user| user.admin);
        admin || state.permissions.iter().any(|held| held == name)
    }

    /// Returns whether the session holds at least one of the permissions.
    pub async fn has_any_permission(&self, names: &[&str]) -> bool {
        for name in names {
            if self.has_permission(name).await {
                return true;
            }
        }

        false
    }

    /// Returns whether the session holds all of the permissions.
    pub async fn has_all_permissions(&self, names: &[&str]) -> bool {
        for name in names {
            if !self.has_permission(name).await {
                return false;
            }
        }

        true
    }

    /// Returns whether the session grants access to a module.
    pub async fn can_access_module(&self, module: &str) -> bool {
        let state = self.state.read().await;
        let admin = state.user.as_ref().is_some_and(|user| user.admin);
        module_access_granted(module, admin, &state.permissions, &state.rights)
    }

    /// Returns the sorted modules the held permissions grant access to.
    pub async fn accessible_modules(&self) -> Vec<String> {
        accessible_modules(&self.state.read().await.permissions)
    }

    async fn derive_for(&self, user: &User) -> AppResult<Vec<String>> {
        let known = self.store.permissions().await?;
        let groups = self.store.groups().await?;
        Ok(derive_permission_names(user, &groups, &known))
    }

    async fn load_session_record(&self) -> AppResult<Option<SessionRecord>> {
        let value = self.config.value(SESSION_RECORD_KEY).await?;
        let Some(ConfigValue::Json(raw)) = value else {
            return Ok(None);
        };

        // A malformed record cannot re-establish an identity; treat it
        // the same as a missing one.
        Ok(serde_json::from_value(raw).ok())
    }

    async fn persist_session_record(&self, record: &SessionRecord) -> AppResult<()> {
        let raw = serde_json::to_value(record)
            .map_err(|error| AppError::Internal(format!("session record encoding: {error}")))?;

        self.config
            .set(
                SESSION_RECORD_KEY,
                &ConfigValue::Json(raw),
                Some("Persisted session state"),
            )
            .await
    }

    async fn clear_auth_data(&self) {
        for key in [REMOTE_TOKEN_KEY, SESSION_RECORD_KEY] {
            if let Err(error) = self.config.delete(key).await {
                warn!(%error, key, "could not clear stored session data");
            }
        }
    }
}

/// Generates the opaque local session marker.
///
/// A hex SHA-256 over user identity, the current timestamp, and random
/// bytes. This is a local session marker, not a security credential: the
/// remote bearer token remains the only authorization artifact.
fn session_marker(user: &User) -> AppResult<String> {
    use sha2::{Digest, Sha256};

    let mut random = [0_u8; 32];
    getrandom::fill(&mut random)
        .map_err(|error| AppError::Internal(format!("failed to generate session marker: {error}")))?;

    let mut hasher = Sha256::new();
    hasher.update(user.id.to_le_bytes());
    hasher.update(user.login.as_bytes());
    hasher.update(Utc::now().timestamp_micros().to_le_bytes());
    hasher.update(random);
    let digest = hasher.finalize();

    Ok(digest.iter().fold(String::with_capacity(64), |mut acc, byte| {
        let _ = write!(acc, "{byte:02x}");
        acc
    }))
}
