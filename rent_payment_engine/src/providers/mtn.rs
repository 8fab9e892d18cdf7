use async_trait::async_trait;
use log::*;
use rpg_common::{helpers::normalize_phone, Secret};

use crate::{
    db_types::Provider,
    providers::{InitiateParams, ProviderAck, ProviderError, ProviderGateway, ProviderStatus},
};

/// MTN Mobile Money collection adapter.
///
/// The real integration is a `requesttopay` call against the MoMo API, authenticated with the
/// operator's subscription key. This adapter simulates that leg: it acknowledges immediately with
/// a deterministic provider transaction id and reports `PENDING`, exactly as the live API does
/// while the subscriber decides on the handset prompt.
pub struct MtnGateway {
    payment_number: String,
    merchant_name: String,
    api_key: Secret<String>,
}

impl MtnGateway {
    pub fn new(payment_number: String, merchant_name: String, api_key: Secret<String>) -> Self {
        let payment_number = normalize_phone(&payment_number);
        debug!("🔌️ MTN Mobile Money gateway configured for {payment_number}");
        Self { payment_number, merchant_name, api_key }
    }
}

#[async_trait]
impl ProviderGateway for MtnGateway {
    fn provider(&self) -> Provider {
        Provider::Mtn
    }

    fn payment_number(&self) -> &str {
        &self.payment_number
    }

    async fn initiate(&self, params: InitiateParams<'_>) -> Result<ProviderAck, ProviderError> {
        let payer = normalize_phone(params.payer_phone);
        if payer.is_empty() {
            return Err(ProviderError::Rejected(Provider::Mtn, "Payer phone number is empty".into()));
        }
        trace!("🔌️ Authorising against the MoMo collections API (key {})", self.api_key);
        info!(
            "🔌️ Initiating MTN Mobile Money collection of {} from {payer} (ref {})",
            params.amount, params.reference
        );
        let ack = ProviderAck {
            provider_tx_id: format!("MTN-{}", params.external_id),
            provider_status: "PENDING".to_string(),
            customer_message: format!(
                "Payment request of {} sent to {payer}. Approve the prompt on your phone to pay {}.",
                params.amount, self.merchant_name
            ),
        };
        Ok(ack)
    }

    async fn poll_status(&self, provider_tx_id: &str) -> Result<ProviderStatus, ProviderError> {
        trace!("🔌️ Polling MTN Mobile Money for status of {provider_tx_id}");
        Ok(ProviderStatus { provider_tx_id: provider_tx_id.to_string(), status: "SUCCESSFUL".to_string() })
    }
}
