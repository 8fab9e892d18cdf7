use chrono::{Duration, NaiveDate};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Tenant, TenantCategory, Unit, DAYS_PER_RENT_PERIOD},
    traits::TenantDirectoryError,
};

pub async fn active_tenants(
    property_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Tenant>, TenantDirectoryError> {
    let rows = match property_id {
        Some(pid) => {
            sqlx::query_as("SELECT * FROM tenants WHERE is_active = 1 AND property_id = ? ORDER BY id")
                .bind(pid)
                .fetch_all(conn)
                .await?
        },
        None => sqlx::query_as("SELECT * FROM tenants WHERE is_active = 1 ORDER BY id").fetch_all(conn).await?,
    };
    Ok(rows)
}

pub async fn tenant_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Tenant>, TenantDirectoryError> {
    let row = sqlx::query_as("SELECT * FROM tenants WHERE id = ?").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn record_rent_payment(
    tenant_id: i64,
    paid_on: NaiveDate,
    months_advance: i64,
    conn: &mut SqliteConnection,
) -> Result<Tenant, TenantDirectoryError> {
    let next_due = paid_on + Duration::days(DAYS_PER_RENT_PERIOD * months_advance.max(1));
    let row = sqlx::query_as(
        r#"
            UPDATE tenants
            SET last_payment_date = $1, next_payment_due = $2, category = 'Paid',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(paid_on)
    .bind(next_due)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?
    .ok_or(TenantDirectoryError::TenantNotFound(tenant_id))?;
    Ok(row)
}

pub async fn set_category(
    tenant_id: i64,
    category: TenantCategory,
    conn: &mut SqliteConnection,
) -> Result<(), TenantDirectoryError> {
    let updated = sqlx::query("UPDATE tenants SET category = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(category)
        .bind(tenant_id)
        .execute(conn)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(TenantDirectoryError::TenantNotFound(tenant_id));
    }
    Ok(())
}

pub async fn mark_moved_out(
    tenant_id: i64,
    on: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Tenant, TenantDirectoryError> {
    let row: Tenant = sqlx::query_as(
        r#"
            UPDATE tenants
            SET category = 'MovedOut', is_active = 0, move_out_date = COALESCE(move_out_date, $1),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(on)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?
    .ok_or(TenantDirectoryError::TenantNotFound(tenant_id))?;
    Ok(row)
}

pub async fn release_unit(unit_id: i64, conn: &mut SqliteConnection) -> Result<(), TenantDirectoryError> {
    sqlx::query("UPDATE units SET status = 'Available', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(unit_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn unit_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Unit>, TenantDirectoryError> {
    let row = sqlx::query_as("SELECT id, property_id, unit_number, monthly_rent, status FROM units WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}
