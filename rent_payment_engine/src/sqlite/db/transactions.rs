use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{MobileTransaction, NewMobileTransaction},
    traits::PaymentEngineError,
};

pub async fn idempotent_insert(
    transaction: NewMobileTransaction,
    conn: &mut SqliteConnection,
) -> Result<MobileTransaction, PaymentEngineError> {
    let external_id = transaction.external_id.clone();
    let row = sqlx::query_as(
        r#"
            INSERT INTO mobile_transactions (
                request_id, unit_id, tenant_id, payer_id, amount, provider, external_id,
                payer_phone, payee_phone, reference, description, months_advance, is_prepayment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(transaction.request_id)
    .bind(transaction.unit_id)
    .bind(transaction.tenant_id)
    .bind(transaction.payer_id)
    .bind(transaction.amount)
    .bind(transaction.provider)
    .bind(transaction.external_id)
    .bind(transaction.payer_phone)
    .bind(transaction.payee_phone)
    .bind(transaction.reference)
    .bind(transaction.description)
    .bind(transaction.months_advance)
    .bind(transaction.is_prepayment)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            PaymentEngineError::TransactionAlreadyExists(external_id)
        },
        _ => PaymentEngineError::from(e),
    })?;
    Ok(row)
}

pub async fn record_provider_ack(
    external_id: &str,
    provider_tx_id: &str,
    provider_status: &str,
    raw_response: &str,
    conn: &mut SqliteConnection,
) -> Result<MobileTransaction, PaymentEngineError> {
    let row = sqlx::query_as(
        r#"
            UPDATE mobile_transactions
            SET provider_tx_id = $1, provider_status = $2, provider_response = $3, updated_at = CURRENT_TIMESTAMP
            WHERE external_id = $4
            RETURNING *;
        "#,
    )
    .bind(provider_tx_id)
    .bind(provider_status)
    .bind(raw_response)
    .bind(external_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentEngineError::TransactionNotFound(external_id.to_string()))?;
    Ok(row)
}

/// Single-writer settle to `Paid`. The status guard in the WHERE clause is the idempotency
/// boundary: only a transaction that is still pending takes the transition, and the caller learns
/// via `None` that someone else settled it first.
pub async fn settle_paid(
    external_id: &str,
    provider_status: &str,
    raw_callback: &str,
    when: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<MobileTransaction>, PaymentEngineError> {
    let row = sqlx::query_as(
        r#"
            UPDATE mobile_transactions
            SET status = 'Paid', provider_status = $1, callback_payload = $2, completed_at = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE external_id = $4 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(provider_status)
    .bind(raw_callback)
    .bind(when)
    .bind(external_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Single-writer settle to `Failed`, with the same pending-only guard as [`settle_paid`].
pub async fn settle_failed(
    external_id: &str,
    reason: &str,
    raw_callback: Option<&str>,
    when: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<MobileTransaction>, PaymentEngineError> {
    let row = sqlx::query_as(
        r#"
            UPDATE mobile_transactions
            SET status = 'Failed', failure_reason = $1, callback_payload = COALESCE($2, callback_payload),
                failed_at = $3, updated_at = CURRENT_TIMESTAMP
            WHERE external_id = $4 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(raw_callback)
    .bind(when)
    .bind(external_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn fetch_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MobileTransaction>, PaymentEngineError> {
    let row = sqlx::query_as("SELECT * FROM mobile_transactions WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn fetch_by_provider_id(
    provider_tx_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MobileTransaction>, PaymentEngineError> {
    let row = sqlx::query_as("SELECT * FROM mobile_transactions WHERE provider_tx_id = ?")
        .bind(provider_tx_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn paid_in_window(
    start: NaiveDate,
    end: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<MobileTransaction>, PaymentEngineError> {
    let rows = sqlx::query_as(
        r#"
            SELECT * FROM mobile_transactions
            WHERE status = 'Paid' AND date(completed_at) BETWEEN date($1) AND date($2)
            ORDER BY completed_at;
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn unlinked_paid(conn: &mut SqliteConnection) -> Result<Vec<MobileTransaction>, PaymentEngineError> {
    let rows =
        sqlx::query_as("SELECT * FROM mobile_transactions WHERE status = 'Paid' AND tenant_id IS NULL")
            .fetch_all(conn)
            .await?;
    Ok(rows)
}

pub async fn link_tenant(
    transaction_id: i64,
    tenant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<MobileTransaction, PaymentEngineError> {
    let row = sqlx::query_as(
        "UPDATE mobile_transactions SET tenant_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(tenant_id)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentEngineError::TransactionNotFound(format!("internal id {transaction_id}")))?;
    Ok(row)
}
