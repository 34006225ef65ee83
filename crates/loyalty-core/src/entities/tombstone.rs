//! Tombstone - soft-delete record for an account folded into another
//!
//! A tombstone keeps the row id and nothing personal, so the account can no
//! longer be found by email or phone and will never be re-merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Account;
use crate::value_objects::AccountId;

/// Soft-delete record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub id: AccountId,
    /// Master account the victim was folded into
    #[serde(default)]
    pub merged_into: Option<AccountId>,
    pub deleted_at: DateTime<Utc>,
}

impl Tombstone {
    pub fn new(id: AccountId, merged_into: Option<AccountId>, deleted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            merged_into,
            deleted_at,
        }
    }
}

/// A row of the remote `accounts` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AccountRecord {
    Active(Account),
    Deleted(Tombstone),
}

impl AccountRecord {
    /// Row id, for either variant
    pub fn id(&self) -> crate::AccountId {
        match self {
            Self::Active(account) => account.id,
            Self::Deleted(tombstone) => tombstone.id,
        }
    }

    pub fn as_active(&self) -> Option<&Account> {
        match self {
            Self::Active(account) => Some(account),
            Self::Deleted(_) => None,
        }
    }

    pub fn into_active(self) -> Option<Account> {
        match self {
            Self::Active(account) => Some(account),
            Self::Deleted(_) => None,
        }
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors() {
        let account = Account::new("a@b.com", "04121234567", "Ana");
        let id = account.id;
        let active = AccountRecord::Active(account);
        assert_eq!(active.id(), id);
        assert!(!active.is_deleted());
        assert!(active.as_active().is_some());

        let deleted = AccountRecord::Deleted(Tombstone::new(id, None, Utc::now()));
        assert!(deleted.is_deleted());
        assert!(deleted.into_active().is_none());
    }

    #[test]
    fn test_tombstone_carries_no_identity() {
        let record = AccountRecord::Deleted(Tombstone::new(AccountId::new(), None, Utc::now()));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["state"], "deleted");
        assert!(value.get("email").is_none());
        assert!(value.get("phone").is_none());
    }
}
