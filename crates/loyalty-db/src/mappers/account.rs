//! Account record <-> model mapper

use chrono::{DateTime, Utc};
use loyalty_core::{Account, AccountRecord, Tombstone};
use uuid::Uuid;

use crate::models::AccountModel;

/// Decode an accounts row into a record
impl TryFrom<AccountModel> for AccountRecord {
    type Error = serde_json::Error;

    fn try_from(model: AccountModel) -> Result<Self, Self::Error> {
        serde_json::from_value(model.doc.0)
    }
}

/// Column values for an accounts upsert
#[derive(Debug, Clone)]
pub struct AccountWrite {
    pub id: Uuid,
    pub email: String,
    pub phone_key: String,
    pub role: &'static str,
    pub referral_code: String,
    pub doc: serde_json::Value,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AccountWrite {
    pub fn active(account: &Account) -> Result<Self, serde_json::Error> {
        let doc = serde_json::to_value(AccountRecord::Active(account.clone()))?;
        Ok(Self {
            id: account.id.into_inner(),
            email: account.email_key(),
            phone_key: account.phone_key().as_str().to_string(),
            role: if account.is_admin() { "admin" } else { "customer" },
            referral_code: account.referral_code.trim().to_string(),
            doc,
            deleted_at: None,
        })
    }

    /// Tombstone rows keep no email, phone or referral code
    pub fn tombstone(tombstone: &Tombstone) -> Result<Self, serde_json::Error> {
        let doc = serde_json::to_value(AccountRecord::Deleted(tombstone.clone()))?;
        Ok(Self {
            id: tombstone.id.into_inner(),
            email: String::new(),
            phone_key: String::new(),
            role: "customer",
            referral_code: String::new(),
            doc,
            deleted_at: Some(tombstone.deleted_at),
        })
    }
}
