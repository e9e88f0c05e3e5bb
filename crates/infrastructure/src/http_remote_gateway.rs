//! Reqwest-based remote gateway.
//!
//! Stateless: every call resolves the base endpoint from configuration
//! and attaches the caller's bearer credential. Transport failures,
//! non-success statuses, and malformed payloads surface as distinct
//! error values; only `logout` is best-effort.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;

use dolimirror_application::{
    ConfigService, LoginSuccess, RemoteGateway, RemoteGroup, RemoteUser,
};
use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{Product, ThirdParty};

mod wire;

use wire::{WireGroup, WireLoginReply, WireProduct, WireThirdParty, WireUser};

/// HTTP implementation of the [`RemoteGateway`] port.
pub struct HttpRemoteGateway {
    http: reqwest::Client,
    config: ConfigService,
}

impl HttpRemoteGateway {
    /// Creates a gateway over an injected HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: ConfigService) -> Self {
        Self { http, config }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, token: &str) -> AppResult<T> {
        let url = self.config.api_url(endpoint).await?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("GET {endpoint}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(remote_status(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|error| AppError::Decode(format!("GET {endpoint}: {error}")))
    }
}

async fn remote_status(status: StatusCode, response: reqwest::Response) -> AppError {
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());

    AppError::RemoteStatus {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn login(&self, login: &str, password: &str) -> AppResult<LoginSuccess> {
        let url = self.config.api_url("login").await?;

        let response = self
            .http
            .post(&url)
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("POST login: {error}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Credential("login failed".to_owned()));
        }
        if !status.is_success() {
            return Err(remote_status(status, response).await);
        }

        let reply: WireLoginReply = response
            .json()
            .await
            .map_err(|error| AppError::Decode(format!("POST login: {error}")))?;

        let Some(grant) = reply.success else {
            return Err(AppError::Credential(
                reply.error.unwrap_or_else(|| "login failed".to_owned()),
            ));
        };

        Ok(LoginSuccess {
            token: grant.token,
            user: reply.user.map(WireUser::into_remote),
        })
    }

    async fn introspect(&self, token: &str) -> AppResult<()> {
        let url = self.config.api_url("users/info").await?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("GET users/info: {error}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Credential("token invalid".to_owned()))
        }
    }

    async fn user_info(&self, token: &str) -> AppResult<RemoteUser> {
        let user: WireUser = self.get_json("users/info?withrights=1", token).await?;
        Ok(user.into_remote())
    }

    async fn fetch_users(&self, token: &str) -> AppResult<Vec<RemoteUser>> {
        let rows: Vec<WireUser> = self.get_json("users", token).await?;
        Ok(rows.into_iter().map(WireUser::into_remote).collect())
    }

    async fn fetch_groups(&self, token: &str) -> AppResult<Vec<RemoteGroup>> {
        let rows: Vec<WireGroup> = self.get_json("groups", token).await?;
        Ok(rows.into_iter().map(WireGroup::into_remote).collect())
    }

    async fn fetch_third_parties(&self, token: &str) -> AppResult<Vec<ThirdParty>> {
        let rows: Vec<WireThirdParty> = self.get_json("thirdparties", token).await?;
        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| row.into_third_party(now))
            .collect())
    }

    async fn fetch_products(&self, token: &str) -> AppResult<Vec<Product>> {
        let rows: Vec<WireProduct> = self.get_json("products", token).await?;
        let now = Utc::now();
        Ok(rows.into_iter().map(|row| row.into_product(now)).collect())
    }

    async fn logout(&self, token: &str) {
        let url = match self.config.api_url("logout").await {
            Ok(url) => url,
            Err(error) => {
                warn!(%error, "remote logout skipped");
                return;
            }
        };

        match self.http.post(&url).bearer_auth(token).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!(status = %response.status(), "remote logout refused"),
            Err(error) => warn!(%error, "remote logout failed"),
        }
    }

    async fn test_connection(&self) -> AppResult<()> {
        let url = self.config.api_url("status").await?;

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("GET status: {error}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(remote_status(status, response).await)
        }
    }
}
