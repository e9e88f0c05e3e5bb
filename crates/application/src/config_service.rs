//! Typed configuration access and base-endpoint management.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use dolimirror_core::{AppError, AppResult};
use dolimirror_domain::{ConfigEntry, ConfigValueType};

use crate::LocalStore;

/// Configuration key holding the remote base endpoint.
pub const BASE_URL_KEY: &str = "dolibarr_url";

/// Configuration key holding the remote bearer credential.
pub const REMOTE_TOKEN_KEY: &str = "dolibarr_token";

/// Configuration key holding the persisted session record.
pub const SESSION_RECORD_KEY: &str = "session_record";

/// A decoded configuration value, tagged with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Plain string value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Flag(bool),
    /// Structured JSON value.
    Json(Value),
}

impl ConfigValue {
    /// Returns the storage type tag for this value.
    #[must_use]
    pub fn value_type(&self) -> ConfigValueType {
        match self {
            Self::Text(_) => ConfigValueType::String,
            Self::Number(_) => ConfigValueType::Number,
            Self::Flag(_) => ConfigValueType::Boolean,
            Self::Json(_) => ConfigValueType::Json,
        }
    }

    /// Encodes the value into its stored string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::Flag(value) => value.to_string(),
            Self::Json(value) => value.to_string(),
        }
    }

    /// Decodes a stored entry per its declared type tag.
    ///
    /// Returns `None` when the stored string does not decode; absence and
    /// decode failure are both answered with the caller's default.
    #[must_use]
    pub fn decode(entry: &ConfigEntry) -> Option<Self> {
        match entry.value_type {
            ConfigValueType::String => Some(Self::Text(entry.value.clone())),
            ConfigValueType::Number => entry.value.parse::<f64>().ok().map(Self::Number),
            ConfigValueType::Boolean => Some(Self::Flag(entry.value == "true")),
            ConfigValueType::Json => serde_json::from_str(&entry.value).ok().map(Self::Json),
        }
    }
}

/// Persisted key/value configuration with typed, forgiving reads.
///
/// A missing key is a normal state (first run), not a fault: reads fall
/// back to the caller-supplied default instead of erroring.
#[derive(Clone)]
pub struct ConfigService {
    store: Arc<dyn LocalStore>,
}

impl ConfigService {
    /// Creates a configuration service over the local store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Returns the decoded value for a key, or `None` when the key is
    /// missing or its stored string fails to decode.
    pub async fn value(&self, key: &str) -> AppResult<Option<ConfigValue>> {
        let entry = self.store.configuration(key).await?;
        Ok(entry.as_ref().and_then(ConfigValue::decode))
    }

    /// Returns the decoded value for a key, falling back to `default`.
    pub async fn value_or(&self, key: &str, default: ConfigValue) -> AppResult<ConfigValue> {
        Ok(self.value(key).await?.unwrap_or(default))
    }

    /// Returns a non-empty string value for a key, if one is stored.
    ///
    /// An empty stored string counts as absent; clearing a string setting
    /// by writing `""` is equivalent to deleting it.
    pub async fn string_value(&self, key: &str) -> AppResult<Option<String>> {
        let value = self.value(key).await?;
        Ok(match value {
            Some(ConfigValue::Text(text)) if !text.is_empty() => Some(text),
            _ => None,
        })
    }

    /// Returns the stored remote bearer credential, if any.
    pub async fn remote_token(&self) -> AppResult<Option<String>> {
        self.string_value(REMOTE_TOKEN_KEY).await
    }

    /// Upserts a configuration value by key.
    pub async fn set(
        &self,
        key: &str,
        value: &ConfigValue,
        description: Option<&str>,
    ) -> AppResult<()> {
        self.store
            .set_configuration(key, &value.encode(), value.value_type(), description)
            .await
    }

    /// Deletes a configuration entry; missing keys are not an error.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.store.delete_configuration(key).await
    }

    /// Lists every stored configuration entry.
    pub async fn all(&self) -> AppResult<Vec<ConfigEntry>> {
        self.store.configurations().await
    }

    /// Returns the configured remote base endpoint, if any.
    pub async fn base_url(&self) -> AppResult<Option<String>> {
        self.string_value(BASE_URL_KEY).await
    }

    /// Validates, normalizes, and persists the remote base endpoint.
    ///
    /// Only absolute `http`/`https` URLs are accepted; a trailing slash
    /// is appended when missing. Returns the normalized form.
    pub async fn set_base_url(&self, raw: &str) -> AppResult<String> {
        let normalized = normalize_base_url(raw)?;

        self.set(
            BASE_URL_KEY,
            &ConfigValue::Text(normalized.clone()),
            Some("Remote server URL"),
        )
        .await?;

        Ok(normalized)
    }

    /// Removes the configured base endpoint.
    pub async fn clear_base_url(&self) -> AppResult<()> {
        self.delete(BASE_URL_KEY).await
    }

    /// Returns whether a valid base endpoint is configured.
    pub async fn is_configuration_complete(&self) -> AppResult<bool> {
        let stored = self.base_url().await?;
        Ok(stored.is_some_and(|url| normalize_base_url(&url).is_ok()))
    }

    /// Builds the REST API URL for an endpoint under the configured base.
    pub async fn api_url(&self, endpoint: &str) -> AppResult<String> {
        let base = self.require_base_url().await?;
        Ok(format!("{base}api/index.php/{endpoint}"))
    }

    /// Builds a web URL for a path under the configured base.
    pub async fn web_url(&self, path: &str) -> AppResult<String> {
        let base = self.require_base_url().await?;
        Ok(format!("{base}{path}"))
    }

    async fn require_base_url(&self) -> AppResult<String> {
        self.base_url().await?.ok_or_else(|| {
            AppError::Configuration("remote base URL is not configured".to_owned())
        })
    }
}

fn normalize_base_url(raw: &str) -> AppResult<String> {
    let parsed = Url::parse(raw)
        .map_err(|error| AppError::Validation(format!("invalid base URL '{raw}': {error}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(format!(
            "base URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    let mut normalized = parsed.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    Ok(normalized)
}
