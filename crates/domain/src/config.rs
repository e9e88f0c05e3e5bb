//! Persisted typed configuration entries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dolimirror_core::AppError;
use serde::{Deserialize, Serialize};

/// Declared type of a configuration value.
///
/// Values are stored as strings and decoded per this tag on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigValueType {
    /// Plain string, returned verbatim.
    #[default]
    String,
    /// Decoded with a floating-point parse.
    Number,
    /// Decoded by comparison against the literal `"true"`.
    Boolean,
    /// Decoded as a JSON document.
    Json,
}

impl ConfigValueType {
    /// Returns the stable storage string for this type tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl FromStr for ConfigValueType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "json" => Ok(Self::Json),
            _ => Err(AppError::Validation(format!(
                "unknown configuration value type '{value}'"
            ))),
        }
    }
}

/// A single typed setting, unique by key and upserted in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique configuration key.
    pub key: String,
    /// Stringified value, decoded per `value_type`.
    pub value: String,
    /// Declared value type.
    pub value_type: ConfigValueType,
    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
    /// Local bookkeeping timestamp, stamped on every upsert.
    pub updated_at: DateTime<Utc>,
}
