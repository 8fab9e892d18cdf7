use chrono::NaiveDate;
use thiserror::Error;

use crate::db_types::{Tenant, TenantCategory, Unit};

/// Read/write access to the tenant and unit records the engine needs.
///
/// The tenant directory is a collaborator, not engine-owned state: the engine reads rents, phones
/// and due dates, and writes back the derived payment fields. Everything else about tenants and
/// units belongs to the CRUD layer.
#[allow(async_fn_in_trait)]
pub trait TenantDirectory: Clone {
    /// All active tenants, optionally restricted to one property.
    async fn active_tenants(&self, property_id: Option<i64>) -> Result<Vec<Tenant>, TenantDirectoryError>;

    async fn tenant_by_id(&self, id: i64) -> Result<Option<Tenant>, TenantDirectoryError>;

    /// Applies the tenant-side effects of a confirmed rent payment: sets `last_payment_date` to
    /// `paid_on`, advances `next_payment_due` by 30 days per month paid (counted from `paid_on`),
    /// and sets the category to `Paid`. Returns the updated tenant.
    async fn record_rent_payment(
        &self,
        tenant_id: i64,
        paid_on: NaiveDate,
        months_advance: i64,
    ) -> Result<Tenant, TenantDirectoryError>;

    async fn set_category(&self, tenant_id: i64, category: TenantCategory) -> Result<(), TenantDirectoryError>;

    /// Marks a tenant as moved out: category `MovedOut`, deactivated, move-out date stamped if it
    /// was not already set, and the tenant's unit released back to `Available`.
    async fn mark_moved_out(&self, tenant_id: i64, on: NaiveDate) -> Result<(), TenantDirectoryError>;

    async fn unit_by_id(&self, id: i64) -> Result<Option<Unit>, TenantDirectoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum TenantDirectoryError {
    #[error("Tenant directory database error: {0}")]
    DatabaseError(String),
    #[error("The requested tenant {0} does not exist")]
    TenantNotFound(i64),
}

impl From<sqlx::Error> for TenantDirectoryError {
    fn from(e: sqlx::Error) -> Self {
        TenantDirectoryError::DatabaseError(e.to_string())
    }
}
