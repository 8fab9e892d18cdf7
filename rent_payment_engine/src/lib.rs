//! Rent Payment Engine
//!
//! The rent payment engine is the core of the rent payment gateway. It issues scannable payment
//! requests, tracks mobile-money transactions through their asynchronous, provider-driven
//! confirmation process, reconciles confirmed money movements against what tenants owe, and
//! recomputes each tenant's payment category from date arithmetic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should
//!    never need to access the database directly; use the public API instead. The exception is the
//!    data types used in the database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@rpe_api`]): the payment flow (issue / initiate / confirm), the
//!    reconciliation engine, and the tenant status monitor. Backends implement the traits in
//!    [`mod@traits`] in order to serve these APIs.
//! 3. The provider gateway adapters ([`mod@providers`]): one adapter per mobile-money provider,
//!    sharing a single initiation/status contract.
//!
//! The engine also emits events when payments are confirmed. A simple actor-style hook system lets
//! callers subscribe and react, for example to send a confirmation SMS.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod providers;
pub mod qr;
pub mod rpe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use rpe_api::{
    monitor_api::{categorize, TenantMonitorApi},
    payment_flow_api::{
        ConfirmationDisposition,
        ConfirmationOutcome,
        InitiatePayment,
        IssuedRequest,
        PaymentFlowApi,
        ProviderConfirmation,
    },
    reconciliation_api::ReconciliationApi,
    report_objects::{Period, ReconciliationReport},
};
pub use traits::{PaymentEngineError, PaymentStore, TenantDirectory, TenantDirectoryError};
