//! PostgreSQL implementation of RemoteStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use loyalty_core::{
    Account, AccountRecord, Collection, DomainError, Order, Prize, RemoteStore, RepoResult,
    Settings, Tombstone,
};

use crate::mappers::{AccountWrite, SettingWrite, PRIZE_CATALOG_KEY, STORE_SETTINGS_KEY};
use crate::models::{AccountModel, OrderModel, SettingModel};

use super::error::{map_db_error, map_document_error};
use super::rows::{write_account, write_guest_order, write_setting};

/// PostgreSQL implementation of RemoteStore
#[derive(Clone)]
pub struct PgRemoteStore {
    pool: PgPool,
}

impl PgRemoteStore {
    /// Create a new PgRemoteStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_setting(&self, key: &str) -> RepoResult<Option<SettingModel>> {
        sqlx::query_as::<_, SettingModel>(
            r"
            SELECT key, value
            FROM settings
            WHERE key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

#[async_trait]
impl RemoteStore for PgRemoteStore {
    #[instrument(skip(self))]
    async fn fetch_accounts(&self) -> RepoResult<Vec<AccountRecord>> {
        let models = sqlx::query_as::<_, AccountModel>(
            r"
            SELECT id, doc, deleted_at, updated_at
            FROM accounts
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut records = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id;
            match AccountRecord::try_from(model) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(%id, error = %e, "Skipping malformed account row"),
            }
        }
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn fetch_guest_orders(&self) -> RepoResult<Vec<Order>> {
        let models = sqlx::query_as::<_, OrderModel>(
            r"
            SELECT id, doc, updated_at
            FROM orders
            ORDER BY updated_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut orders = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match Order::try_from(model) {
                Ok(order) => orders.push(order),
                Err(e) => tracing::warn!(%id, error = %e, "Skipping malformed order row"),
            }
        }
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn fetch_settings(&self) -> RepoResult<Option<Settings>> {
        self.fetch_setting(STORE_SETTINGS_KEY)
            .await?
            .map(|model| serde_json::from_value(model.value.0))
            .transpose()
            .map_err(map_document_error)
    }

    #[instrument(skip(self))]
    async fn fetch_prize_catalog(&self) -> RepoResult<Option<Vec<Prize>>> {
        self.fetch_setting(PRIZE_CATALOG_KEY)
            .await?
            .map(|model| serde_json::from_value(model.value.0))
            .transpose()
            .map_err(map_document_error)
    }

    #[instrument(skip(self, accounts), fields(count = accounts.len()))]
    async fn upsert_accounts(&self, accounts: &[Account]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        for account in accounts {
            let row = AccountWrite::active(account).map_err(map_document_error)?;
            write_account(&mut tx, &row).await?;
        }
        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self), fields(id = %tombstone.id))]
    async fn upsert_tombstone(&self, tombstone: &Tombstone) -> RepoResult<()> {
        let row = AccountWrite::tombstone(tombstone).map_err(map_document_error)?;
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        write_account(&mut conn, &row).await
    }

    #[instrument(skip(self, orders), fields(count = orders.len()))]
    async fn upsert_guest_orders(&self, orders: &[Order]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        for order in orders {
            write_guest_order(&mut tx, order).await?;
        }
        tx.commit().await.map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn upsert_settings(&self, settings: &Settings) -> RepoResult<()> {
        let row = SettingWrite::new(STORE_SETTINGS_KEY, settings).map_err(map_document_error)?;
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        write_setting(&mut conn, &row).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: Collection, id: &str) -> RepoResult<()> {
        let result = match collection {
            Collection::Accounts => {
                let id = Uuid::parse_str(id)
                    .map_err(|_| DomainError::ValidationError(format!("invalid account id: {id}")))?;
                sqlx::query("DELETE FROM accounts WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
            Collection::Orders => {
                sqlx::query("DELETE FROM orders WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
            Collection::Settings => {
                sqlx::query("DELETE FROM settings WHERE key = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
            Collection::Votes => {
                sqlx::query("DELETE FROM votes WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
            Collection::Surveys => {
                sqlx::query("DELETE FROM surveys WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
        };

        let rows = result.map_err(map_db_error)?.rows_affected();
        tracing::debug!(%collection, id, rows, "Deleted remote document");
        Ok(())
    }
}
