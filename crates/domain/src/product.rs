//! Product and service rows mirrored locally.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dolimirror_core::AppError;
use serde::{Deserialize, Serialize};

/// Whether a catalog entry is a physical product or a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Physical, stockable product.
    #[default]
    Product,
    /// Service without stock.
    Service,
}

impl ProductKind {
    /// Returns the stable storage string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
        }
    }
}

impl FromStr for ProductKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "product" => Ok(Self::Product),
            "service" => Ok(Self::Service),
            _ => Err(AppError::Validation(format!(
                "unknown product kind '{value}'"
            ))),
        }
    }
}

/// A catalog entry mirrored from the remote backend.
///
/// Like third parties, the local collection is a whole-snapshot mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Remote backend identifier.
    pub id: i64,
    /// Catalog reference code.
    pub reference: String,
    /// Display label.
    pub label: String,
    /// Optional long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Product or service.
    pub kind: ProductKind,
    /// Unit price excluding tax.
    pub price: f64,
    /// Unit price including tax.
    pub price_incl_tax: f64,
    /// Raw backend status code.
    pub status: i32,
    /// Category label.
    pub category: String,
    /// Units in stock.
    pub stock: i64,
    /// Stock level that triggers an alert.
    pub stock_alert: i64,
    /// Optional image location.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Local bookkeeping timestamp, stamped on insert.
    pub created_at: DateTime<Utc>,
    /// Local bookkeeping timestamp, stamped on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the human-readable label for the backend status code.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        match self.status {
            0 => "Draft",
            1 => "Active",
            -1 => "Inactive",
            -2 => "Obsolete",
            _ => "Unknown",
        }
    }
}

/// Facet filters applied to a product view after the text filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilters {
    /// Free-text query, tokenized on whitespace.
    pub query: String,
    /// Product/service facet.
    pub kind: Option<ProductKind>,
    /// Status label facet, matched against [`Product::status_label`].
    pub status: Option<String>,
    /// Category facet.
    pub category: Option<String>,
}
