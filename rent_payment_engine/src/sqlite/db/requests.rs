use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentRequest, PaymentRequest},
    traits::PaymentEngineError,
};

pub async fn insert_request(
    request: NewPaymentRequest,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PaymentRequest, PaymentEngineError> {
    let expires_at = request.expiry_from(now);
    let row = sqlx::query_as(
        r#"
            INSERT INTO payment_requests (unit_id, tenant_id, payer_id, amount, account_number, provider, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(request.unit_id)
    .bind(request.tenant_id)
    .bind(request.payer_id)
    .bind(request.amount)
    .bind(request.account_number)
    .bind(request.provider)
    .bind(expires_at)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn attach_payload(
    id: i64,
    payload: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentRequest, PaymentEngineError> {
    let row = sqlx::query_as(
        "UPDATE payment_requests SET payload = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(payload)
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(PaymentEngineError::RequestNotFound(id))?;
    Ok(row)
}

pub async fn fetch_request(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRequest>, PaymentEngineError> {
    let row = sqlx::query_as("SELECT * FROM payment_requests WHERE id = ?").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn requests_for_unit(
    unit_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
    let rows = sqlx::query_as("SELECT * FROM payment_requests WHERE unit_id = ? ORDER BY created_at DESC")
        .bind(unit_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Guarded transition Active -> Used. Returns `None` when the request is not active, so a replayed
/// confirmation cannot consume a request twice.
pub async fn mark_used(
    id: i64,
    when: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRequest>, PaymentEngineError> {
    let row = sqlx::query_as(
        r#"
            UPDATE payment_requests SET status = 'Used', used_at = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'Active'
            RETURNING *;
        "#,
    )
    .bind(when)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn cancel(id: i64, conn: &mut SqliteConnection) -> Result<PaymentRequest, PaymentEngineError> {
    let row: Option<PaymentRequest> = sqlx::query_as(
        r#"
            UPDATE payment_requests SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Active'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => Ok(row),
        None => match fetch_request(id, conn).await? {
            Some(existing) => {
                Err(PaymentEngineError::RequestNotActive { id, status: existing.status.to_string() })
            },
            None => Err(PaymentEngineError::RequestNotFound(id)),
        },
    }
}

pub async fn expire_stale(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
    let rows = sqlx::query_as(
        r#"
            UPDATE payment_requests SET status = 'Expired', updated_at = CURRENT_TIMESTAMP
            WHERE status = 'Active' AND expires_at <= $1
            RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
