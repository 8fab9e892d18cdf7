use std::fmt::Display;

use chrono::{DateTime, Utc};
use rent_payment_engine::{
    db_types::{MobileTransaction, NewPaymentRequest, Provider, TransactionStatus, DEFAULT_REQUEST_EXPIRY_DAYS},
    ConfirmationOutcome,
    ProviderConfirmation,
};
use rpg_common::Ugx;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------  Request issuance    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequestParams {
    pub unit_id: i64,
    #[serde(default)]
    pub tenant_id: Option<i64>,
    pub payer_id: i64,
    pub amount: Ugx,
    pub account_number: String,
    pub provider: Provider,
    #[serde(default = "default_expiry_days")]
    pub expires_in_days: i64,
}

fn default_expiry_days() -> i64 {
    DEFAULT_REQUEST_EXPIRY_DAYS
}

impl From<IssueRequestParams> for NewPaymentRequest {
    fn from(params: IssueRequestParams) -> Self {
        NewPaymentRequest {
            unit_id: params.unit_id,
            tenant_id: params.tenant_id,
            payer_id: params.payer_id,
            amount: params.amount,
            account_number: params.account_number,
            provider: params.provider,
            expires_in_days: params.expires_in_days,
        }
    }
}

//--------------------------------------   Status polling     ---------------------------------------------------------
/// The client-facing view of a transaction, for status polls.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionStatusResponse {
    pub external_id: String,
    pub status: TransactionStatus,
    pub amount: Ugx,
    pub currency: String,
    pub provider: Provider,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl From<MobileTransaction> for TransactionStatusResponse {
    fn from(tx: MobileTransaction) -> Self {
        Self {
            external_id: tx.external_id,
            status: tx.status,
            amount: tx.amount,
            currency: tx.currency,
            provider: tx.provider,
            initiated_at: tx.initiated_at,
            completed_at: tx.completed_at,
            failed_at: tx.failed_at,
            failure_reason: tx.failure_reason,
        }
    }
}

//--------------------------------------  Provider callbacks  ---------------------------------------------------------
/// MTN's callback body. `externalId` carries our idempotency key back; older gateway versions
/// used `reference` instead, so both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct MtnCallback {
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "financialTransactionId")]
    pub financial_transaction_id: Option<String>,
    pub status: String,
    pub reason: Option<String>,
}

impl MtnCallback {
    pub fn into_confirmation(self, raw: serde_json::Value) -> ProviderConfirmation {
        let outcome = if matches!(self.status.to_ascii_lowercase().as_str(), "successful" | "completed" | "success")
        {
            ConfirmationOutcome::Success { provider_status: self.status }
        } else {
            ConfirmationOutcome::Failure {
                reason: self.reason.unwrap_or_else(|| format!("Payment failed ({})", self.status)),
            }
        };
        ProviderConfirmation {
            provider: Provider::Mtn,
            external_id: self.external_id.or(self.reference),
            provider_tx_id: self.financial_transaction_id,
            outcome,
            raw,
        }
    }
}

/// Airtel wraps everything in a `transaction` object and reports terminal outcomes as status
/// codes: `TS` for success, `TF` for failure. `id` echoes our external id; `airtel_money_id` is
/// their own transaction id.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtelCallback {
    pub transaction: AirtelTransaction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtelTransaction {
    pub id: Option<String>,
    pub airtel_money_id: Option<String>,
    pub status_code: String,
    pub message: Option<String>,
}

impl AirtelCallback {
    pub fn into_confirmation(self, raw: serde_json::Value) -> ProviderConfirmation {
        let tx = self.transaction;
        let outcome = if tx.status_code.eq_ignore_ascii_case("TS") {
            ConfirmationOutcome::Success { provider_status: tx.status_code }
        } else {
            ConfirmationOutcome::Failure {
                reason: tx.message.unwrap_or_else(|| format!("Payment failed ({})", tx.status_code)),
            }
        };
        ProviderConfirmation {
            provider: Provider::Airtel,
            external_id: tx.id,
            provider_tx_id: tx.airtel_money_id,
            outcome,
            raw,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveParams {
    pub payload: String,
}

//--------------------------------------  Reconciliation params -------------------------------------------------------
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub property_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoMatchParams {
    pub property_id: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mtn_success_callback_normalises() {
        let raw = serde_json::json!({
            "externalId": "abc123",
            "financialTransactionId": "MTN-abc123",
            "status": "SUCCESSFUL"
        });
        let callback: MtnCallback = serde_json::from_value(raw.clone()).unwrap();
        let confirmation = callback.into_confirmation(raw);
        assert_eq!(confirmation.provider, Provider::Mtn);
        assert_eq!(confirmation.external_id.as_deref(), Some("abc123"));
        assert_eq!(confirmation.provider_tx_id.as_deref(), Some("MTN-abc123"));
        assert!(matches!(confirmation.outcome, ConfirmationOutcome::Success { .. }));
    }

    #[test]
    fn mtn_failure_callback_carries_the_reason() {
        let raw = serde_json::json!({
            "reference": "abc123",
            "status": "FAILED",
            "reason": "Payer rejected the prompt"
        });
        let callback: MtnCallback = serde_json::from_value(raw.clone()).unwrap();
        let confirmation = callback.into_confirmation(raw);
        // falls back to `reference` when `externalId` is absent
        assert_eq!(confirmation.external_id.as_deref(), Some("abc123"));
        match confirmation.outcome {
            ConfirmationOutcome::Failure { reason } => assert_eq!(reason, "Payer rejected the prompt"),
            other => panic!("Expected failure outcome, got {other:?}"),
        }
    }

    #[test]
    fn airtel_status_codes_map_to_outcomes() {
        let raw = serde_json::json!({
            "transaction": {"id": "xyz789", "airtel_money_id": "AIRTEL-xyz789", "status_code": "TS"}
        });
        let callback: AirtelCallback = serde_json::from_value(raw.clone()).unwrap();
        let confirmation = callback.into_confirmation(raw);
        assert_eq!(confirmation.provider, Provider::Airtel);
        assert_eq!(confirmation.external_id.as_deref(), Some("xyz789"));
        assert!(matches!(confirmation.outcome, ConfirmationOutcome::Success { .. }));

        let raw = serde_json::json!({
            "transaction": {"id": "xyz789", "status_code": "TF", "message": "Insufficient balance"}
        });
        let callback: AirtelCallback = serde_json::from_value(raw.clone()).unwrap();
        let confirmation = callback.into_confirmation(raw);
        match confirmation.outcome {
            ConfirmationOutcome::Failure { reason } => assert_eq!(reason, "Insufficient balance"),
            other => panic!("Expected failure outcome, got {other:?}"),
        }
    }
}
