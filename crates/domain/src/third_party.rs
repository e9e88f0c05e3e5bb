//! Third-party (customer/supplier/prospect) rows mirrored locally.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dolimirror_core::AppError;
use serde::{Deserialize, Serialize};

/// Commercial status of a third party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirdPartyStatus {
    /// The relation is active.
    #[default]
    Active,
    /// The relation is dormant.
    Inactive,
    /// The relation is suspended.
    Suspended,
}

impl ThirdPartyStatus {
    /// Returns the stable storage string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

impl FromStr for ThirdPartyStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            _ => Err(AppError::Validation(format!(
                "unknown third-party status '{value}'"
            ))),
        }
    }
}

/// A business relation mirrored from the remote backend.
///
/// The local copy is an eventually consistent snapshot: every successful
/// remote refresh replaces the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdParty {
    /// Remote backend identifier.
    pub id: i64,
    /// Company or person name.
    pub name: String,
    /// Alternate trading name.
    #[serde(default)]
    pub name_alias: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub zip: Option<String>,
    /// Town.
    #[serde(default)]
    pub town: Option<String>,
    /// State or region.
    #[serde(default)]
    pub state: Option<String>,
    /// Country.
    #[serde(default)]
    pub country: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Web site.
    #[serde(default)]
    pub website: Option<String>,
    /// Whether the relation is a customer.
    pub client: bool,
    /// Whether the relation is a supplier.
    pub supplier: bool,
    /// Whether the relation is a prospect.
    pub prospect: bool,
    /// Commercial status.
    pub status: ThirdPartyStatus,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
    /// Local bookkeeping timestamp, stamped on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Last recorded contact, if any.
    #[serde(default)]
    pub last_contact: Option<DateTime<Utc>>,
}

/// Facet filters applied to a third-party view after the text filter.
///
/// A `None` facet places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThirdPartyFilters {
    /// Free-text query, tokenized on whitespace.
    pub query: String,
    /// Customer facet.
    pub client: Option<bool>,
    /// Supplier facet.
    pub supplier: Option<bool>,
    /// Prospect facet.
    pub prospect: Option<bool>,
    /// Status facet.
    pub status: Option<ThirdPartyStatus>,
}
