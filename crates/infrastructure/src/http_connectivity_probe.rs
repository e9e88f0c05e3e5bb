//! HTTP reachability probe against the configured base endpoint.

use async_trait::async_trait;

use dolimirror_application::{ConfigService, ConnectivityProbe};
use dolimirror_core::{AppError, AppResult};

/// Probes the configured base endpoint with a lightweight HEAD request.
///
/// A success status means reachable; any other status or a transport
/// failure is reported as an error the monitor records without throwing.
pub struct HttpConnectivityProbe {
    http: reqwest::Client,
    config: ConfigService,
}

impl HttpConnectivityProbe {
    /// Creates a probe over an injected HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: ConfigService) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> AppResult<bool> {
        let url = self.config.base_url().await?.ok_or_else(|| {
            AppError::Configuration("remote base URL is not configured".to_owned())
        })?;

        let response = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|error| AppError::Transport(format!("HEAD {url}: {error}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            Err(AppError::RemoteStatus {
                status: status.as_u16(),
                message: format!("endpoint not reachable: {url}"),
            })
        }
    }
}
