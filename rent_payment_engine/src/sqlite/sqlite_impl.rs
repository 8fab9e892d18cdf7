//! `SqliteDatabase` is the concrete SQLite backend for the rent payment engine.
//!
//! It owns a connection pool and implements the storage traits in [`crate::traits`]. Single-row
//! operations borrow a pooled connection; multi-step flows (marking a tenant moved out and
//! releasing their unit) run inside one database transaction.
use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, requests, tenants, transactions};
use crate::{
    db_types::{
        MobileTransaction,
        NewMobileTransaction,
        NewPaymentRequest,
        PaymentRequest,
        Tenant,
        TenantCategory,
        Unit,
    },
    traits::{PaymentEngineError, PaymentStore, TenantDirectory, TenantDirectoryError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database connection pool with `max_connections` connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentEngineError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Connects using `RPG_DATABASE_URL`, falling back to the default on-disk store.
    pub async fn new_default(max_connections: u32) -> Result<Self, PaymentEngineError> {
        let url = super::db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let row = requests::insert_request(request, Utc::now(), &mut conn).await?;
        debug!("🗃️ Payment request #{} saved (expires {})", row.id, row.expires_at);
        Ok(row)
    }

    async fn attach_payload(&self, id: i64, payload: &str) -> Result<PaymentRequest, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        requests::attach_payload(id, payload, &mut conn).await
    }

    async fn fetch_request(&self, id: i64) -> Result<Option<PaymentRequest>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        requests::fetch_request(id, &mut conn).await
    }

    async fn requests_for_unit(&self, unit_id: i64) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        requests::requests_for_unit(unit_id, &mut conn).await
    }

    async fn mark_request_used(
        &self,
        id: i64,
        when: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        requests::mark_used(id, when, &mut conn).await
    }

    async fn cancel_request(&self, id: i64) -> Result<PaymentRequest, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        requests::cancel(id, &mut conn).await
    }

    async fn expire_stale_requests(&self, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let expired = requests::expire_stale(now, &mut conn).await?;
        if !expired.is_empty() {
            debug!("🗃️ {} payment requests flipped to Expired", expired.len());
        }
        Ok(expired)
    }

    async fn insert_transaction(
        &self,
        transaction: NewMobileTransaction,
    ) -> Result<MobileTransaction, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::idempotent_insert(transaction, &mut conn).await?;
        debug!("🗃️ Mobile transaction [{}] created in Pending for {}", row.external_id, row.amount);
        Ok(row)
    }

    async fn record_provider_ack(
        &self,
        external_id: &str,
        provider_tx_id: &str,
        provider_status: &str,
        raw_response: &str,
    ) -> Result<MobileTransaction, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_provider_ack(external_id, provider_tx_id, provider_status, raw_response, &mut conn)
            .await
    }

    async fn settle_paid(
        &self,
        external_id: &str,
        provider_status: &str,
        raw_callback: &str,
        when: DateTime<Utc>,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::settle_paid(external_id, provider_status, raw_callback, when, &mut conn).await
    }

    async fn settle_failed(
        &self,
        external_id: &str,
        reason: &str,
        raw_callback: Option<&str>,
        when: DateTime<Utc>,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::settle_failed(external_id, reason, raw_callback, when, &mut conn).await
    }

    async fn fetch_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_by_external_id(external_id, &mut conn).await
    }

    async fn fetch_transaction_by_provider_id(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_by_provider_id(provider_tx_id, &mut conn).await
    }

    async fn paid_transactions_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::paid_in_window(start, end, &mut conn).await
    }

    async fn unlinked_paid_transactions(&self) -> Result<Vec<MobileTransaction>, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        transactions::unlinked_paid(&mut conn).await
    }

    async fn link_transaction_to_tenant(
        &self,
        transaction_id: i64,
        tenant_id: i64,
    ) -> Result<MobileTransaction, PaymentEngineError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::link_tenant(transaction_id, tenant_id, &mut conn).await?;
        debug!("🗃️ Transaction [{}] linked to tenant #{tenant_id}", row.external_id);
        Ok(row)
    }
}

impl TenantDirectory for SqliteDatabase {
    async fn active_tenants(&self, property_id: Option<i64>) -> Result<Vec<Tenant>, TenantDirectoryError> {
        let mut conn = self.pool.acquire().await?;
        tenants::active_tenants(property_id, &mut conn).await
    }

    async fn tenant_by_id(&self, id: i64) -> Result<Option<Tenant>, TenantDirectoryError> {
        let mut conn = self.pool.acquire().await?;
        tenants::tenant_by_id(id, &mut conn).await
    }

    async fn record_rent_payment(
        &self,
        tenant_id: i64,
        paid_on: NaiveDate,
        months_advance: i64,
    ) -> Result<Tenant, TenantDirectoryError> {
        let mut conn = self.pool.acquire().await?;
        let tenant = tenants::record_rent_payment(tenant_id, paid_on, months_advance, &mut conn).await?;
        debug!(
            "🗃️ Tenant #{tenant_id} paid {} month(s); next due {}",
            months_advance,
            tenant.next_payment_due.map(|d| d.to_string()).unwrap_or_default()
        );
        Ok(tenant)
    }

    async fn set_category(&self, tenant_id: i64, category: TenantCategory) -> Result<(), TenantDirectoryError> {
        let mut conn = self.pool.acquire().await?;
        tenants::set_category(tenant_id, category, &mut conn).await
    }

    async fn mark_moved_out(&self, tenant_id: i64, on: NaiveDate) -> Result<(), TenantDirectoryError> {
        let mut tx = self.pool.begin().await?;
        let tenant = tenants::mark_moved_out(tenant_id, on, &mut tx).await?;
        tenants::release_unit(tenant.unit_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Tenant #{tenant_id} moved out; unit #{} released", tenant.unit_id);
        Ok(())
    }

    async fn unit_by_id(&self, id: i64) -> Result<Option<Unit>, TenantDirectoryError> {
        let mut conn = self.pool.acquire().await?;
        tenants::unit_by_id(id, &mut conn).await
    }
}
