//! PostgreSQL implementation of LedgerProcedures
//!
//! Each call is one transaction: the affected rows are locked with
//! `SELECT … FOR UPDATE`, the settlement rule runs against the stored
//! documents, and the documents are written back before commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use loyalty_common::LoyaltyConfig;
use loyalty_core::ledger::settlement;
use loyalty_core::{
    Account, DomainError, LedgerProcedures, Order, Prize, ProcessedOrder, RepoResult,
    RewardPolicy,
};

use super::error::{account_not_found, map_db_error, order_not_found};
use super::rows::{
    lock_account_by_email, lock_guest_order, lock_order_owner, lock_referrer, save_account,
    write_guest_order,
};

/// Parameters the procedures settle with
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureConfig {
    pub welcome_bonus_usd: f64,
    pub reward_policy: RewardPolicy,
    pub prize_cooldown_days: i64,
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        Self::from(&LoyaltyConfig::default())
    }
}

impl From<&LoyaltyConfig> for ProcedureConfig {
    fn from(config: &LoyaltyConfig) -> Self {
        Self {
            welcome_bonus_usd: config.welcome_bonus_usd,
            reward_policy: config.reward_policy(),
            prize_cooldown_days: config.prize_cooldown_days,
        }
    }
}

/// PostgreSQL implementation of LedgerProcedures
#[derive(Clone)]
pub struct PgLedgerProcedures {
    pool: PgPool,
    config: ProcedureConfig,
}

impl PgLedgerProcedures {
    pub fn new(pool: PgPool, config: ProcedureConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl LedgerProcedures for PgLedgerProcedures {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn register_account(&self, account: &Account) -> RepoResult<Account> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Serializes concurrent registrations of the same email
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(account.email_key())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let email_taken = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM accounts WHERE lower(email) = $1 AND deleted_at IS NULL)
            ",
        )
        .bind(account.email_key())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if email_taken {
            return Err(DomainError::EmailAlreadyExists);
        }

        let phone_key = account.phone_key();
        if !phone_key.is_empty() {
            let phone_taken = sqlx::query_scalar::<_, bool>(
                r"
                SELECT EXISTS(SELECT 1 FROM accounts WHERE phone_key = $1 AND deleted_at IS NULL)
                ",
            )
            .bind(phone_key.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if phone_taken {
                return Err(DomainError::PhoneAlreadyExists);
            }
        }

        let mut created = account.clone();
        settlement::open_account(&mut created, self.config.welcome_bonus_usd);
        save_account(&mut tx, &created).await?;
        tx.commit().await.map_err(map_db_error)?;

        tracing::info!(id = %created.id, "Account registered");
        Ok(created)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn process_order(&self, email: &str, order: &Order) -> RepoResult<ProcessedOrder> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut account = lock_account_by_email(&mut tx, email)
            .await?
            .ok_or_else(|| account_not_found(email))?;
        let processed =
            settlement::record_order(&mut account, order, &self.config.reward_policy, Utc::now())?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(processed)
    }

    #[instrument(skip(self))]
    async fn approve_order(&self, order_id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if let Some(mut owner) = lock_order_owner(&mut tx, order_id).await? {
            let approved_subtotal = settlement::approve_owned_order(&mut owner, order_id)?;
            save_account(&mut tx, &owner).await?;

            if let (Some(subtotal), Some(code)) = (approved_subtotal, owner.referred_by.as_deref()) {
                if let Some(mut referrer) = lock_referrer(&mut tx, code, owner.id).await? {
                    let bonus = settlement::pay_referrer(&mut referrer, subtotal);
                    save_account(&mut tx, &referrer).await?;
                    tracing::debug!(referrer = %referrer.id, bonus, "Referral bonus paid");
                }
            }
        } else if let Some(mut order) = lock_guest_order(&mut tx, order_id).await? {
            settlement::approve_order_record(&mut order)?;
            write_guest_order(&mut tx, &order).await?;
        } else {
            return Err(order_not_found(order_id));
        }

        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn reject_order(&self, order_id: &str) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if let Some(mut owner) = lock_order_owner(&mut tx, order_id).await? {
            let refund = settlement::reject_owned_order(&mut owner, order_id)?;
            save_account(&mut tx, &owner).await?;
            tracing::debug!(refund, "Order rejected");
        } else if let Some(mut order) = lock_guest_order(&mut tx, order_id).await? {
            settlement::reject_order_record(&mut order)?;
            write_guest_order(&mut tx, &order).await?;
        } else {
            return Err(order_not_found(order_id));
        }

        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn debit_wallet(&self, email: &str, amount: f64) -> RepoResult<f64> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut account = lock_account_by_email(&mut tx, email)
            .await?
            .ok_or_else(|| account_not_found(email))?;
        account.debit_wallet(amount)?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(account.wallet_balance)
    }

    #[instrument(skip(self, prize), fields(prize = %prize.id))]
    async fn award_prize(&self, email: &str, prize: &Prize, at: DateTime<Utc>) -> RepoResult<Account> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut account = lock_account_by_email(&mut tx, email)
            .await?
            .ok_or_else(|| account_not_found(email))?;
        settlement::apply_prize(&mut account, prize, at, self.config.prize_cooldown_days)?;
        save_account(&mut tx, &account).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(account)
    }
}
