//! Signed-in account state
//!
//! The persisted record only names the account; the account itself is read
//! from the cached snapshot, so a refresh after each pull keeps it current.

use chrono::{DateTime, Utc};
use loyalty_cache::{LocalCache, SessionRecord};
use loyalty_core::{Account, Snapshot};
use tracing::info;

use super::error::{ServiceError, ServiceResult, SyncError, SyncResult};

#[derive(Debug, Clone, Default)]
pub struct Session {
    account: Option<Account>,
    signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Restore the persisted session against the cached snapshot
    pub async fn load(cache: &LocalCache) -> SyncResult<Self> {
        let Some(record) = cache.load_session().await.map_err(SyncError::Cache)? else {
            return Ok(Self::signed_out());
        };

        let snapshot = cache.load_snapshot().await.map_err(SyncError::Cache)?;
        Ok(match snapshot.account(&record.email) {
            Some(account) => Self {
                account: Some(account.clone()),
                signed_in_at: Some(record.signed_in_at),
            },
            None => Self::signed_out(),
        })
    }

    pub async fn save(&self, cache: &LocalCache) -> SyncResult<()> {
        let record = self.record();
        cache
            .save_session(record.as_ref())
            .await
            .map_err(SyncError::Cache)
    }

    fn record(&self) -> Option<SessionRecord> {
        let account = self.account.as_ref()?;
        Some(SessionRecord {
            email: account.email.clone(),
            signed_in_at: self.signed_in_at.unwrap_or_else(Utc::now),
        })
    }

    pub fn sign_in(&mut self, account: Account) {
        self.account = Some(account);
        self.signed_in_at = Some(Utc::now());
    }

    pub fn sign_out(&mut self) {
        self.account = None;
        self.signed_in_at = None;
    }

    /// Replace the held account with its copy in `snapshot`.
    ///
    /// An account that is no longer there (unified away, deleted) signs the
    /// session out. Returns whether the session is still signed in.
    pub fn refresh_from(&mut self, snapshot: &Snapshot) -> bool {
        let Some(current) = &self.account else {
            return false;
        };

        match snapshot.account(&current.email) {
            Some(account) => {
                self.account = Some(account.clone());
                true
            }
            None => {
                info!(email = %current.email, "Signed-in account no longer exists, signing out");
                self.sign_out();
                false
            }
        }
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.email.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.account.is_some()
    }

    /// The signed-in account, or a validation error
    pub fn require(&self) -> ServiceResult<&Account> {
        self.account
            .as_ref()
            .ok_or_else(|| ServiceError::validation("Sign in first"))
    }
}
