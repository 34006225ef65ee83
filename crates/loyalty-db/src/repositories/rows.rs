//! Row-level statements shared by the store and the procedures
//!
//! Everything here runs on a caller-provided connection so the procedures
//! can compose it inside one transaction.

use loyalty_core::{Account, AccountRecord, AccountId, Order, RepoResult};
use sqlx::types::Json;
use sqlx::PgConnection;

use crate::mappers::{AccountWrite, OrderWrite, SettingWrite};
use crate::models::{AccountModel, OrderModel};

use super::error::{map_db_error, map_document_error};

/// Insert or replace an account row. A tombstoned row is never overwritten.
pub async fn write_account(conn: &mut PgConnection, row: &AccountWrite) -> RepoResult<()> {
    sqlx::query(
        r"
        INSERT INTO accounts (id, email, phone_key, role, referral_code, doc, deleted_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (id) DO UPDATE SET
            email = EXCLUDED.email,
            phone_key = EXCLUDED.phone_key,
            role = EXCLUDED.role,
            referral_code = EXCLUDED.referral_code,
            doc = EXCLUDED.doc,
            deleted_at = EXCLUDED.deleted_at,
            updated_at = NOW()
        WHERE accounts.deleted_at IS NULL
        ",
    )
    .bind(row.id)
    .bind(&row.email)
    .bind(&row.phone_key)
    .bind(row.role)
    .bind(&row.referral_code)
    .bind(Json(&row.doc))
    .bind(row.deleted_at)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

pub async fn save_account(conn: &mut PgConnection, account: &Account) -> RepoResult<()> {
    let row = AccountWrite::active(account).map_err(map_document_error)?;
    write_account(conn, &row).await
}

pub async fn write_guest_order(conn: &mut PgConnection, order: &Order) -> RepoResult<()> {
    let row = OrderWrite::new(order).map_err(map_document_error)?;
    sqlx::query(
        r"
        INSERT INTO orders (id, doc, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
        ",
    )
    .bind(&row.id)
    .bind(Json(&row.doc))
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

pub async fn write_setting(conn: &mut PgConnection, row: &SettingWrite) -> RepoResult<()> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        ",
    )
    .bind(row.key)
    .bind(Json(&row.value))
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

fn active_account(model: AccountModel) -> RepoResult<Option<Account>> {
    let record = AccountRecord::try_from(model).map_err(map_document_error)?;
    Ok(record.into_active())
}

/// Lock the live account with this email
pub async fn lock_account_by_email(conn: &mut PgConnection, email: &str) -> RepoResult<Option<Account>> {
    let model = sqlx::query_as::<_, AccountModel>(
        r"
        SELECT id, doc, deleted_at, updated_at
        FROM accounts
        WHERE lower(email) = lower($1) AND deleted_at IS NULL
        ORDER BY updated_at DESC
        LIMIT 1
        FOR UPDATE
        ",
    )
    .bind(email.trim())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    model.map_or(Ok(None), active_account)
}

/// Lock the live account that owns an order
pub async fn lock_order_owner(conn: &mut PgConnection, order_id: &str) -> RepoResult<Option<Account>> {
    let model = sqlx::query_as::<_, AccountModel>(
        r"
        SELECT id, doc, deleted_at, updated_at
        FROM accounts
        WHERE deleted_at IS NULL
          AND doc -> 'orders' @> jsonb_build_array(jsonb_build_object('id', $1::text))
        LIMIT 1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    model.map_or(Ok(None), active_account)
}

/// Lock the live account owning a referral code, other than `exclude`
pub async fn lock_referrer(
    conn: &mut PgConnection,
    code: &str,
    exclude: AccountId,
) -> RepoResult<Option<Account>> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }

    let model = sqlx::query_as::<_, AccountModel>(
        r"
        SELECT id, doc, deleted_at, updated_at
        FROM accounts
        WHERE upper(referral_code) = upper($1) AND deleted_at IS NULL AND id <> $2
        LIMIT 1
        FOR UPDATE
        ",
    )
    .bind(code)
    .bind(exclude.into_inner())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    model.map_or(Ok(None), active_account)
}

pub async fn lock_guest_order(conn: &mut PgConnection, order_id: &str) -> RepoResult<Option<Order>> {
    let model = sqlx::query_as::<_, OrderModel>(
        r"
        SELECT id, doc, updated_at
        FROM orders
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    model
        .map(Order::try_from)
        .transpose()
        .map_err(map_document_error)
}
