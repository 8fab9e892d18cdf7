//! Confirmation ingestors, one route per provider.
//!
//! Each handler normalises the provider's own callback shape into a [`ProviderConfirmation`] and
//! hands it to the payment flow. Webhook responses must always be in the 200 range - including
//! for malformed bodies and unknown transactions - otherwise the provider keeps retrying a
//! delivery we have already decided about. That is why the handlers take raw bytes and do their
//! own parsing instead of letting the JSON extractor reject the request.
use actix_web::{post, web, HttpResponse};
use log::*;
use rent_payment_engine::{ConfirmationDisposition, ProviderConfirmation};
use serde::de::DeserializeOwned;

use crate::{
    data_objects::{AirtelCallback, JsonResponse, MtnCallback},
    routes::FlowApi,
};

#[post("/webhook/mtn")]
pub async fn mtn_webhook(body: web::Bytes, api: web::Data<FlowApi>) -> HttpResponse {
    trace!("📨️ Received MTN Mobile Money callback");
    let result = match parse_callback::<MtnCallback>(&body, "MTN") {
        Some((callback, raw)) => process_confirmation(&api, callback.into_confirmation(raw)).await,
        None => JsonResponse::failure("Unrecognised callback body"),
    };
    HttpResponse::Ok().json(result)
}

#[post("/webhook/airtel")]
pub async fn airtel_webhook(body: web::Bytes, api: web::Data<FlowApi>) -> HttpResponse {
    trace!("📨️ Received Airtel Money callback");
    let result = match parse_callback::<AirtelCallback>(&body, "Airtel") {
        Some((callback, raw)) => process_confirmation(&api, callback.into_confirmation(raw)).await,
        None => JsonResponse::failure("Unrecognised callback body"),
    };
    HttpResponse::Ok().json(result)
}

fn parse_callback<T: DeserializeOwned>(body: &[u8], provider_label: &str) -> Option<(T, serde_json::Value)> {
    let raw: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| warn!("📨️ {provider_label} callback body is not JSON. {e}"))
        .ok()?;
    let callback = serde_json::from_value(raw.clone())
        .map_err(|e| warn!("📨️ Could not parse {provider_label} callback. {e}"))
        .ok()?;
    Some((callback, raw))
}

async fn process_confirmation(api: &FlowApi, confirmation: ProviderConfirmation) -> JsonResponse {
    match api.apply_confirmation(confirmation).await {
        Ok(ConfirmationDisposition::Applied(tx)) => {
            info!("📨️ Confirmation applied: [{}] is now {}", tx.external_id, tx.status);
            JsonResponse::success(format!("Transaction {}", tx.status))
        },
        Ok(ConfirmationDisposition::AlreadySettled(tx)) => {
            info!("📨️ Replayed confirmation for [{}]; already {}", tx.external_id, tx.status);
            JsonResponse::success(format!("Transaction already {}", tx.status))
        },
        Ok(ConfirmationDisposition::Unmatched) => {
            // acknowledged so the provider stops retrying; logged for operator follow-up
            JsonResponse::failure("Transaction not found")
        },
        Err(e) => {
            error!("📨️ Error while applying confirmation. {e}");
            JsonResponse::failure("Error while processing callback")
        },
    }
}
