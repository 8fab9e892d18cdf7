use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::{
    db_types::{MobileTransaction, NewMobileTransaction, NewPaymentRequest, PaymentRequest},
    traits::TenantDirectoryError,
};

/// Persistence for payment requests and mobile transactions.
///
/// This is the single shared mutable resource of the engine. All status transitions go through the
/// operations below; nothing else writes these rows. The `settle_*` operations are the
/// single-writer boundary: each is one guarded update that only fires while the transaction is
/// still pending, so two concurrent confirmations for the same `external_id` cannot both apply
/// terminal effects.
#[allow(async_fn_in_trait)]
pub trait PaymentStore: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Inserts a new payment request with an empty payload and returns the stored row.
    ///
    /// Creation is two-phase: the row is inserted first so that its id exists, and the payload
    /// (which embeds that id) is written back with [`PaymentStore::attach_payload`].
    async fn insert_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, PaymentEngineError>;

    /// Writes the scannable payload onto the request and returns the updated row.
    async fn attach_payload(&self, id: i64, payload: &str) -> Result<PaymentRequest, PaymentEngineError>;

    async fn fetch_request(&self, id: i64) -> Result<Option<PaymentRequest>, PaymentEngineError>;

    async fn requests_for_unit(&self, unit_id: i64) -> Result<Vec<PaymentRequest>, PaymentEngineError>;

    /// Marks an active request as used. Returns `None` if the request was not active, so a
    /// concurrent or replayed confirmation cannot consume it twice.
    async fn mark_request_used(
        &self,
        id: i64,
        when: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, PaymentEngineError>;

    /// Cancels an active request. Cancelling a request in any other state is an error.
    async fn cancel_request(&self, id: i64) -> Result<PaymentRequest, PaymentEngineError>;

    /// Flips every active request whose expiry has passed to `Expired` and returns the flipped
    /// rows.
    async fn expire_stale_requests(&self, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>, PaymentEngineError>;

    /// Inserts a new pending transaction. The `external_id` is unique; inserting a duplicate
    /// returns [`PaymentEngineError::TransactionAlreadyExists`].
    async fn insert_transaction(
        &self,
        transaction: NewMobileTransaction,
    ) -> Result<MobileTransaction, PaymentEngineError>;

    /// Records the provider's acknowledgement of an initiation: its transaction id, its status
    /// string, and the raw response body.
    async fn record_provider_ack(
        &self,
        external_id: &str,
        provider_tx_id: &str,
        provider_status: &str,
        raw_response: &str,
    ) -> Result<MobileTransaction, PaymentEngineError>;

    /// Settles a pending transaction as paid. Returns `None` when the transaction is no longer
    /// pending (already settled by a concurrent or earlier confirmation).
    async fn settle_paid(
        &self,
        external_id: &str,
        provider_status: &str,
        raw_callback: &str,
        when: DateTime<Utc>,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError>;

    /// Settles a pending transaction as failed. Returns `None` when the transaction is no longer
    /// pending.
    async fn settle_failed(
        &self,
        external_id: &str,
        reason: &str,
        raw_callback: Option<&str>,
        when: DateTime<Utc>,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError>;

    async fn fetch_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError>;

    async fn fetch_transaction_by_provider_id(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError>;

    /// All paid transactions whose completion date falls within the given (inclusive) window.
    async fn paid_transactions_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MobileTransaction>, PaymentEngineError>;

    /// Paid transactions that are not linked to any tenant. These are the auto-match candidates.
    async fn unlinked_paid_transactions(&self) -> Result<Vec<MobileTransaction>, PaymentEngineError>;

    async fn link_transaction_to_tenant(
        &self,
        transaction_id: i64,
        tenant_id: i64,
    ) -> Result<MobileTransaction, PaymentEngineError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentEngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentEngineError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested payment request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Payment request {id} is {status}, not active")]
    RequestNotActive { id: i64, status: String },
    #[error("Payment request {0} has expired")]
    RequestExpired(i64),
    #[error("The payload does not belong to payment request {0}")]
    PayloadMismatch(i64),
    #[error("The amount must be greater than zero, got {0}")]
    InvalidAmount(i64),
    #[error("Expiry must be between 1 and 30 days, got {0}")]
    InvalidExpiry(i64),
    #[error("Cannot insert transaction, since it already exists with external id {0}")]
    TransactionAlreadyExists(String),
    #[error("The requested transaction does not exist for external id {0}")]
    TransactionNotFound(String),
    #[error("No reconciliation window exists for year {0}, month {1}")]
    InvalidPeriod(i32, u32),
    #[error("Scannable payload error. {0}")]
    PayloadError(String),
    #[error("The provider rejected the initiation. {0}")]
    ProviderRejected(String),
    #[error("{0}")]
    ProviderError(#[from] crate::providers::ProviderError),
    #[error("{0}")]
    TenantError(#[from] TenantDirectoryError),
}

impl From<sqlx::Error> for PaymentEngineError {
    fn from(e: sqlx::Error) -> Self {
        PaymentEngineError::DatabaseError(e.to_string())
    }
}
