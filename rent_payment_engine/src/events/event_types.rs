use serde::Serialize;

use crate::db_types::MobileTransaction;

/// Emitted once a successful confirmation has been fully applied: the transaction is paid, the
/// originating request consumed, and the tenant's due date advanced.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmedEvent {
    pub transaction: MobileTransaction,
}

impl PaymentConfirmedEvent {
    pub fn new(transaction: MobileTransaction) -> Self {
        Self { transaction }
    }
}
