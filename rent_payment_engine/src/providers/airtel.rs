use async_trait::async_trait;
use log::*;
use rpg_common::{helpers::normalize_phone, Secret};

use crate::{
    db_types::Provider,
    providers::{InitiateParams, ProviderAck, ProviderError, ProviderGateway, ProviderStatus},
};

/// Airtel Money collection adapter.
///
/// Simulates the Airtel Money payments API. Airtel reports terminal outcomes with `TS`/`TF`
/// status codes in its callbacks; initiation acknowledgements carry a `PENDING` status while the
/// subscriber approves on their handset.
pub struct AirtelGateway {
    payment_number: String,
    merchant_name: String,
    api_key: Secret<String>,
}

impl AirtelGateway {
    pub fn new(payment_number: String, merchant_name: String, api_key: Secret<String>) -> Self {
        let payment_number = normalize_phone(&payment_number);
        debug!("🔌️ Airtel Money gateway configured for {payment_number}");
        Self { payment_number, merchant_name, api_key }
    }
}

#[async_trait]
impl ProviderGateway for AirtelGateway {
    fn provider(&self) -> Provider {
        Provider::Airtel
    }

    fn payment_number(&self) -> &str {
        &self.payment_number
    }

    async fn initiate(&self, params: InitiateParams<'_>) -> Result<ProviderAck, ProviderError> {
        let payer = normalize_phone(params.payer_phone);
        if payer.is_empty() {
            return Err(ProviderError::Rejected(Provider::Airtel, "Payer phone number is empty".into()));
        }
        trace!("🔌️ Authorising against the Airtel payments API (key {})", self.api_key);
        info!("🔌️ Initiating Airtel Money collection of {} from {payer} (ref {})", params.amount, params.reference);
        let ack = ProviderAck {
            provider_tx_id: format!("AIRTEL-{}", params.external_id),
            provider_status: "PENDING".to_string(),
            customer_message: format!(
                "Payment request of {} sent to {payer}. Approve the prompt on your phone to pay {}.",
                params.amount, self.merchant_name
            ),
        };
        Ok(ack)
    }

    async fn poll_status(&self, provider_tx_id: &str) -> Result<ProviderStatus, ProviderError> {
        trace!("🔌️ Polling Airtel Money for status of {provider_tx_id}");
        Ok(ProviderStatus { provider_tx_id: provider_tx_id.to_string(), status: "TS".to_string() })
    }
}
