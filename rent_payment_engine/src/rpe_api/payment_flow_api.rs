use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        MobileTransaction,
        NewMobileTransaction,
        NewPaymentRequest,
        PaymentRequest,
        Provider,
        MAX_REQUEST_EXPIRY_DAYS,
    },
    events::{EventProducers, PaymentConfirmedEvent},
    helpers,
    providers::{GatewayRegistry, InitiateParams},
    qr,
    traits::{PaymentEngineError, PaymentStore, TenantDirectory},
};

/// A freshly issued payment request together with its rendered QR image.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedRequest {
    pub request: PaymentRequest,
    pub qr_image: String,
}

/// Caller-supplied parameters for starting a mobile transaction against a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePayment {
    pub payer_phone: String,
    pub amount: rpg_common::Ugx,
    #[serde(default = "default_months_advance")]
    pub months_advance: i64,
    #[serde(default)]
    pub is_prepayment: bool,
}

fn default_months_advance() -> i64 {
    1
}

/// A confirmation callback, normalised out of whatever shape the provider delivered it in.
#[derive(Debug, Clone)]
pub struct ProviderConfirmation {
    pub provider: Provider,
    pub external_id: Option<String>,
    pub provider_tx_id: Option<String>,
    pub outcome: ConfirmationOutcome,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum ConfirmationOutcome {
    Success { provider_status: String },
    Failure { reason: String },
}

/// What applying a confirmation actually did.
#[derive(Debug, Clone)]
pub enum ConfirmationDisposition {
    /// The terminal transition was applied by this call.
    Applied(MobileTransaction),
    /// The transaction was already terminal; the stored result is returned unchanged.
    AlreadySettled(MobileTransaction),
    /// No transaction matches the callback. Callers acknowledge anyway.
    Unmatched,
}

/// `PaymentFlowApi` owns a mobile transaction's lifecycle: issuing the scannable request,
/// initiating the transaction with a provider, and driving it to its single terminal state when
/// the provider's confirmation arrives.
#[derive(Clone)]
pub struct PaymentFlowApi<B> {
    db: B,
    gateways: GatewayRegistry,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, gateways: GatewayRegistry, producers: EventProducers) -> Self {
        Self { db, gateways, producers }
    }
}

impl<B> PaymentFlowApi<B>
where B: PaymentStore + TenantDirectory
{
    /// Issues a new scannable payment request.
    ///
    /// Creation is two-phase: the row is inserted first so that its id exists, then the payload
    /// (which embeds that id) is written back, and finally the QR image is rendered from the
    /// payload. The only side effect is the single request row.
    pub async fn issue_request(&self, request: NewPaymentRequest) -> Result<IssuedRequest, PaymentEngineError> {
        if !request.amount.is_positive() {
            return Err(PaymentEngineError::InvalidAmount(request.amount.value()));
        }
        if !(1..=MAX_REQUEST_EXPIRY_DAYS).contains(&request.expires_in_days) {
            return Err(PaymentEngineError::InvalidExpiry(request.expires_in_days));
        }
        let row = self.db.insert_request(request).await?;
        let payload = qr::encode_payload(&row);
        let row = self.db.attach_payload(row.id, &payload).await?;
        let qr_image = qr::render_image(&payload).map_err(|e| PaymentEngineError::PayloadError(e.to_string()))?;
        info!("🔄️🔳️ Issued payment request #{} for {} via {}", row.id, row.amount, row.provider);
        Ok(IssuedRequest { request: row, qr_image })
    }

    /// Resolves a scanned payload back to the request that produced it.
    pub async fn request_for_payload(&self, payload: &str) -> Result<PaymentRequest, PaymentEngineError> {
        let id = qr::decode_payload(payload).map_err(|e| PaymentEngineError::PayloadError(e.to_string()))?;
        let request = self.db.fetch_request(id).await?.ok_or(PaymentEngineError::RequestNotFound(id))?;
        if request.payload != payload {
            return Err(PaymentEngineError::PayloadMismatch(id));
        }
        Ok(request)
    }

    pub async fn fetch_request(&self, id: i64) -> Result<PaymentRequest, PaymentEngineError> {
        self.db.fetch_request(id).await?.ok_or(PaymentEngineError::RequestNotFound(id))
    }

    pub async fn requests_for_unit(&self, unit_id: i64) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
        self.db.requests_for_unit(unit_id).await
    }

    /// Cancels an active request. Requests in any other state cannot move backwards.
    pub async fn cancel_request(&self, id: i64) -> Result<PaymentRequest, PaymentEngineError> {
        let request = self.db.cancel_request(id).await?;
        info!("🔄️🔳️ Payment request #{id} cancelled");
        Ok(request)
    }

    /// Starts a mobile transaction against an active, unexpired request.
    ///
    /// The external id is generated before the provider is contacted; it is the transaction's
    /// idempotency anchor from here on. Provider rejection settles the transaction as `Failed`
    /// immediately and surfaces the reason to the caller.
    pub async fn initiate(
        &self,
        request_id: i64,
        params: InitiatePayment,
    ) -> Result<MobileTransaction, PaymentEngineError> {
        let now = Utc::now();
        let request =
            self.db.fetch_request(request_id).await?.ok_or(PaymentEngineError::RequestNotFound(request_id))?;
        if request.status != crate::db_types::RequestStatus::Active {
            return Err(PaymentEngineError::RequestNotActive {
                id: request_id,
                status: request.status.to_string(),
            });
        }
        if request.is_expired(now) {
            return Err(PaymentEngineError::RequestExpired(request_id));
        }
        if !params.amount.is_positive() {
            return Err(PaymentEngineError::InvalidAmount(params.amount.value()));
        }
        // Resolve the gateway before writing anything, so an unconfigured provider is a pure
        // validation failure.
        let gateway = self.gateways.for_provider(request.provider)?;

        let unit_label = match self.db.unit_by_id(request.unit_id).await? {
            Some(unit) => unit.unit_number,
            None => request.unit_id.to_string(),
        };
        let external_id = helpers::new_external_id();
        let new_tx = NewMobileTransaction {
            request_id: Some(request.id),
            unit_id: request.unit_id,
            tenant_id: request.tenant_id,
            payer_id: request.payer_id,
            amount: params.amount,
            provider: request.provider,
            external_id: external_id.clone(),
            payer_phone: rpg_common::helpers::normalize_phone(&params.payer_phone),
            payee_phone: gateway.payment_number().to_string(),
            reference: helpers::payment_reference(&unit_label, now),
            description: Some(format!("Rent payment for unit {unit_label}")),
            months_advance: params.months_advance.max(1),
            is_prepayment: params.is_prepayment,
        };
        let tx = self.db.insert_transaction(new_tx).await?;
        let initiation = InitiateParams {
            amount: tx.amount,
            payer_phone: &tx.payer_phone,
            external_id: &external_id,
            reference: &tx.reference,
            description: tx.description.as_deref(),
        };
        match gateway.initiate(initiation).await {
            Ok(ack) => {
                let raw = serde_json::to_string(&ack).unwrap_or_default();
                let tx = self
                    .db
                    .record_provider_ack(&external_id, &ack.provider_tx_id, &ack.provider_status, &raw)
                    .await?;
                info!(
                    "🔄️💰️ Transaction [{external_id}] initiated with {} as {}",
                    tx.provider, ack.provider_tx_id
                );
                Ok(tx)
            },
            Err(e) => {
                warn!("🔄️💰️ Provider rejected initiation of [{external_id}]. {e}");
                self.db.settle_failed(&external_id, &e.to_string(), None, Utc::now()).await?;
                Err(PaymentEngineError::ProviderRejected(e.to_string()))
            },
        }
    }

    /// Applies a provider confirmation. This is the only path into the terminal states.
    ///
    /// Idempotent by construction: a transaction that is already terminal is returned unchanged,
    /// and the underlying settle is a single guarded update, so two racing callbacks for the same
    /// external id cannot both apply tenant-side effects.
    pub async fn apply_confirmation(
        &self,
        confirmation: ProviderConfirmation,
    ) -> Result<ConfirmationDisposition, PaymentEngineError> {
        let tx = self.lookup(&confirmation).await?;
        let tx = match tx {
            Some(tx) => tx,
            None => {
                info!(
                    "🔄️📨️ No transaction matches confirmation from {} (external id {:?}, provider tx {:?})",
                    confirmation.provider, confirmation.external_id, confirmation.provider_tx_id
                );
                return Ok(ConfirmationDisposition::Unmatched);
            },
        };
        if tx.status.is_terminal() {
            debug!("🔄️📨️ Replayed confirmation for [{}]; returning stored result", tx.external_id);
            return Ok(ConfirmationDisposition::AlreadySettled(tx));
        }
        let raw = confirmation.raw.to_string();
        let now = Utc::now();
        match confirmation.outcome {
            ConfirmationOutcome::Success { provider_status } => {
                let settled = self.db.settle_paid(&tx.external_id, &provider_status, &raw, now).await?;
                let settled = match settled {
                    Some(t) => t,
                    None => return self.stored_result(&tx.external_id).await,
                };
                self.apply_success_effects(&settled).await?;
                info!("🔄️✅️ Transaction [{}] confirmed paid ({})", settled.external_id, settled.amount);
                self.call_payment_confirmed_hook(&settled).await;
                Ok(ConfirmationDisposition::Applied(settled))
            },
            ConfirmationOutcome::Failure { reason } => {
                let settled = self.db.settle_failed(&tx.external_id, &reason, Some(&raw), now).await?;
                let settled = match settled {
                    Some(t) => t,
                    None => return self.stored_result(&tx.external_id).await,
                };
                info!("🔄️❌️ Transaction [{}] confirmed failed: {reason}", settled.external_id);
                Ok(ConfirmationDisposition::Applied(settled))
            },
        }
    }

    /// Status query fallback for client polling.
    pub async fn transaction_status(&self, external_id: &str) -> Result<MobileTransaction, PaymentEngineError> {
        self.db
            .fetch_transaction_by_external_id(external_id)
            .await?
            .ok_or_else(|| PaymentEngineError::TransactionNotFound(external_id.to_string()))
    }

    /// Retires every active request whose expiry has passed. Run periodically by the scheduler.
    pub async fn expire_stale_requests(&self) -> Result<Vec<PaymentRequest>, PaymentEngineError> {
        self.db.expire_stale_requests(Utc::now()).await
    }

    async fn lookup(
        &self,
        confirmation: &ProviderConfirmation,
    ) -> Result<Option<MobileTransaction>, PaymentEngineError> {
        if let Some(external_id) = &confirmation.external_id {
            if let Some(tx) = self.db.fetch_transaction_by_external_id(external_id).await? {
                return Ok(Some(tx));
            }
        }
        if let Some(provider_tx_id) = &confirmation.provider_tx_id {
            if let Some(tx) = self.db.fetch_transaction_by_provider_id(provider_tx_id).await? {
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    async fn stored_result(&self, external_id: &str) -> Result<ConfirmationDisposition, PaymentEngineError> {
        let current = self
            .db
            .fetch_transaction_by_external_id(external_id)
            .await?
            .ok_or_else(|| PaymentEngineError::TransactionNotFound(external_id.to_string()))?;
        Ok(ConfirmationDisposition::AlreadySettled(current))
    }

    async fn apply_success_effects(&self, settled: &MobileTransaction) -> Result<(), PaymentEngineError> {
        let now = Utc::now();
        if let Some(request_id) = settled.request_id {
            if self.db.mark_request_used(request_id, now).await?.is_none() {
                debug!("🔄️✅️ Request #{request_id} was not active; leaving its status alone");
            }
        }
        if let Some(tenant_id) = settled.tenant_id {
            // The money has moved; a stale tenant link must not unwind the settlement.
            if let Err(e) = self.db.record_rent_payment(tenant_id, now.date_naive(), settled.months_advance).await
            {
                warn!("🔄️✅️ Could not apply tenant effects for [{}]: {e}", settled.external_id);
            }
        }
        Ok(())
    }

    async fn call_payment_confirmed_hook(&self, transaction: &MobileTransaction) {
        for emitter in &self.producers.payment_confirmed_producer {
            debug!("🔄️📬️ Notifying payment confirmed hook subscribers");
            let event = PaymentConfirmedEvent::new(transaction.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
