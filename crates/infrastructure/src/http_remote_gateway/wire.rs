//! Wire payload shapes and lenient field decoding.
//!
//! The backend serializes booleans and numbers inconsistently (`true`,
//! `1`, `"1"`), so flag and id fields tolerate every observed encoding.
//! Validation happens here, at the boundary: the rest of the crate only
//! sees well-typed domain and port values.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use dolimirror_application::{RemoteGroup, RemoteUser};
use dolimirror_domain::{Product, ProductKind, Rights, ThirdParty, ThirdPartyStatus};

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64().unwrap_or(0) != 0,
        Value::String(text) => text == "1" || text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
}

fn to_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(to_i64(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn lenient_id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.iter().filter_map(to_i64).collect())
}

fn unix_seconds(value: &Value) -> Option<DateTime<Utc>> {
    to_i64(value).and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn default_true() -> bool {
    true
}

/// Login reply: the backend nests the grant under `success`.
#[derive(Debug, Deserialize)]
pub(super) struct WireLoginReply {
    #[serde(default)]
    pub success: Option<WireLoginGrant>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireLoginGrant {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireUser {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub admin: bool,
    #[serde(default = "default_true", deserialize_with = "lenient_flag")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub groups: Vec<i64>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub rights: Option<Value>,
}

impl WireUser {
    pub fn into_remote(self) -> RemoteUser {
        RemoteUser {
            id: self.id,
            login: self.login,
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            admin: self.admin,
            active: self.active,
            groups: self.groups,
            permissions: self.permissions,
            rights: self
                .rights
                .map(|value| Rights::from_value(&value))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireGroup {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl WireGroup {
    pub fn into_remote(self) -> RemoteGroup {
        RemoteGroup {
            id: self.id,
            name: self.name,
            description: blank_to_none(self.description),
            permissions: self.permissions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireThirdParty {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_alias: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub client: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub supplier: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub prospect: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "note_public")]
    pub notes: Option<String>,
    #[serde(default)]
    pub last_contact: Option<Value>,
}

impl WireThirdParty {
    pub fn into_third_party(self, now: DateTime<Utc>) -> ThirdParty {
        let status = self
            .status
            .as_deref()
            .and_then(|value| ThirdPartyStatus::from_str(value).ok())
            .unwrap_or_default();

        ThirdParty {
            id: self.id,
            name: self.name,
            name_alias: blank_to_none(self.name_alias),
            address: blank_to_none(self.address),
            zip: blank_to_none(self.zip),
            town: blank_to_none(self.town),
            state: blank_to_none(self.state),
            country: blank_to_none(self.country),
            phone: blank_to_none(self.phone),
            email: blank_to_none(self.email),
            website: blank_to_none(self.website),
            client: self.client,
            supplier: self.supplier,
            prospect: self.prospect,
            status,
            notes: blank_to_none(self.notes),
            created_at: now,
            updated_at: now,
            last_contact: self.last_contact.as_ref().and_then(unix_seconds),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireProduct {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(rename = "price_ttc", default)]
    pub price_incl_tax: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: Option<Value>,
    #[serde(default)]
    pub stock_alert: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub date_creation: Option<Value>,
    #[serde(default)]
    pub date_modification: Option<Value>,
}

impl WireProduct {
    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        let kind = self
            .kind
            .as_deref()
            .and_then(|value| ProductKind::from_str(value).ok())
            .unwrap_or_default();

        let status = self
            .status
            .as_ref()
            .and_then(to_i64)
            .and_then(|value| i32::try_from(value).ok())
            .unwrap_or(1);

        Product {
            id: self.id,
            reference: self.reference,
            label: self.label,
            description: blank_to_none(self.description),
            kind,
            price: self.price.as_ref().and_then(to_f64).unwrap_or(0.0),
            price_incl_tax: self
                .price_incl_tax
                .as_ref()
                .and_then(to_f64)
                .unwrap_or(0.0),
            status,
            category: self
                .category
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Uncategorized".to_owned()),
            stock: self.stock.as_ref().and_then(to_i64).unwrap_or(0),
            stock_alert: self.stock_alert.as_ref().and_then(to_i64).unwrap_or(0),
            image_url: blank_to_none(self.image_url),
            created_at: self
                .date_creation
                .as_ref()
                .and_then(unix_seconds)
                .unwrap_or(now),
            updated_at: self
                .date_modification
                .as_ref()
                .and_then(unix_seconds)
                .unwrap_or(now),
        }
    }
}
