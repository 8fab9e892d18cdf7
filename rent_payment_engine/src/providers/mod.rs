//! Provider gateway adapters.
//!
//! Every mobile-money provider speaks a different protocol, but the engine only needs two verbs:
//! start a collection, and ask after its status. [`ProviderGateway`] is that contract; each
//! provider has one adapter implementing it, and the [`GatewayRegistry`] selects the adapter once
//! per initiation. The adapters here simulate the provider legs end-to-end (the real APIs sit
//! behind operator credentials); the rest of the engine cannot tell the difference, which is the
//! point.

mod airtel;
mod mtn;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rpg_common::{Secret, Ugx};
use serde::Serialize;
use thiserror::Error;

pub use airtel::AirtelGateway;
pub use mtn::MtnGateway;

use crate::db_types::Provider;

/// Everything an adapter needs to ask the provider to collect money from a subscriber.
#[derive(Debug, Clone)]
pub struct InitiateParams<'a> {
    pub amount: Ugx,
    pub payer_phone: &'a str,
    pub external_id: &'a str,
    pub reference: &'a str,
    pub description: Option<&'a str>,
}

/// The provider's acknowledgement of an initiation request.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAck {
    pub provider_tx_id: String,
    pub provider_status: String,
    /// Human-readable text suitable for showing to the payer.
    pub customer_message: String,
}

/// A point-in-time status report from the provider's side.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider_tx_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("No payment number is configured for {0}")]
    NotConfigured(Provider),
    #[error("{0} rejected the request. {1}")]
    Rejected(Provider, String),
    #[error("Could not reach {0}. {1}")]
    Unreachable(Provider, String),
}

/// Uniform interface to heterogeneous mobile-money providers.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    fn provider(&self) -> Provider;

    /// The merchant number collections are paid into.
    fn payment_number(&self) -> &str;

    /// Asks the provider to collect `params.amount` from the payer. The payer approves or rejects
    /// the request on their handset; the outcome arrives later via the confirmation callback.
    async fn initiate(&self, params: InitiateParams<'_>) -> Result<ProviderAck, ProviderError>;

    /// Queries the provider for the current status of a transaction.
    async fn poll_status(&self, provider_tx_id: &str) -> Result<ProviderStatus, ProviderError>;
}

//--------------------------------------  GatewaySettings     ---------------------------------------------------------
/// Operator configuration for the provider adapters. An unset payment number leaves that provider
/// unregistered, and initiations against it fail validation before any state is written.
#[derive(Debug, Clone, Default)]
pub struct GatewaySettings {
    pub merchant_name: String,
    pub mtn_payment_number: Option<String>,
    pub mtn_api_key: Secret<String>,
    pub airtel_payment_number: Option<String>,
    pub airtel_api_key: Secret<String>,
}

//--------------------------------------  GatewayRegistry     ---------------------------------------------------------
/// Holds one adapter per configured provider. Selection happens exactly once, at initiation time.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<Provider, Arc<dyn ProviderGateway>>,
}

impl GatewayRegistry {
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let mut registry = Self::default();
        if let Some(number) = &settings.mtn_payment_number {
            registry.register(Arc::new(MtnGateway::new(
                number.clone(),
                settings.merchant_name.clone(),
                settings.mtn_api_key.clone(),
            )));
        }
        if let Some(number) = &settings.airtel_payment_number {
            registry.register(Arc::new(AirtelGateway::new(
                number.clone(),
                settings.merchant_name.clone(),
                settings.airtel_api_key.clone(),
            )));
        }
        registry
    }

    pub fn register(&mut self, gateway: Arc<dyn ProviderGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn for_provider(&self, provider: Provider) -> Result<Arc<dyn ProviderGateway>, ProviderError> {
        self.gateways.get(&provider).cloned().ok_or(ProviderError::NotConfigured(provider))
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.gateways.contains_key(&provider)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_only_offers_configured_providers() {
        let settings = GatewaySettings {
            merchant_name: "Kampala Heights".into(),
            mtn_payment_number: Some("0772000111".into()),
            ..Default::default()
        };
        let registry = GatewayRegistry::from_settings(&settings);
        assert!(registry.is_configured(Provider::Mtn));
        assert!(!registry.is_configured(Provider::Airtel));
        assert!(matches!(
            registry.for_provider(Provider::Airtel),
            Err(ProviderError::NotConfigured(Provider::Airtel))
        ));
    }

    #[tokio::test]
    async fn simulated_initiation_round_trip() {
        let gw = MtnGateway::new("0772000111".into(), "Kampala Heights".into(), Secret::default());
        let params = InitiateParams {
            amount: Ugx::from(300_000),
            payer_phone: "0701 234 567",
            external_id: "abc123",
            reference: "RENT-A1-20260801",
            description: None,
        };
        let ack = gw.initiate(params).await.unwrap();
        assert_eq!(ack.provider_tx_id, "MTN-abc123");
        assert_eq!(ack.provider_status, "PENDING");
        assert!(ack.customer_message.contains("UGX 300,000"));
    }
}
