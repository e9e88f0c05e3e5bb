//! The pending-mutation ledger for locally-originated changes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dolimirror_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of locally-originated mutation awaiting remote acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// A row was created locally.
    Create,
    /// A row was updated locally.
    Update,
    /// A row was deleted locally.
    Delete,
}

impl LedgerAction {
    /// Returns the stable storage string for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for LedgerAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown ledger action '{value}'"
            ))),
        }
    }
}

/// A recorded local mutation pending remote acknowledgement.
///
/// The ledger is append-only audit data: entries are written when a local
/// change happens while offline and flagged once acknowledged. No replay
/// or conflict resolution is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLedgerEntry {
    /// Auto-assigned local identifier.
    pub id: i64,
    /// Collection the mutation belongs to, e.g. `third_parties`.
    pub entity_type: String,
    /// Identifier of the mutated row.
    pub entity_id: i64,
    /// Kind of mutation.
    pub action: LedgerAction,
    /// Snapshot of the mutated data.
    pub payload: Value,
    /// Whether the mutation has been acknowledged remotely.
    pub synced: bool,
    /// When the mutation was recorded.
    pub created_at: DateTime<Utc>,
    /// When the mutation was acknowledged, if it has been.
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a ledger entry; ids and timestamps are
/// assigned by the store on append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    /// Collection the mutation belongs to.
    pub entity_type: String,
    /// Identifier of the mutated row.
    pub entity_id: i64,
    /// Kind of mutation.
    pub action: LedgerAction,
    /// Snapshot of the mutated data.
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::LedgerAction;

    #[test]
    fn action_roundtrips_through_storage_value() {
        for action in [LedgerAction::Create, LedgerAction::Update, LedgerAction::Delete] {
            let restored = LedgerAction::from_str(action.as_str());
            assert_eq!(restored.unwrap_or(LedgerAction::Create), action);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(LedgerAction::from_str("merge").is_err());
    }
}
