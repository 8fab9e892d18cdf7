//! The scannable payload codec and QR rendering.
//!
//! A payload deterministically encodes the id of the payment request it was issued for, so any
//! holder of the payload (or of the QR image rendered from it) can resolve exactly that request.
//! The query string carries the display fields a wallet app shows before the payer commits; only
//! the id is authoritative.

use std::fmt::Write as _;

use qrcode::{render::unicode, QrCode};
use thiserror::Error;

use crate::db_types::PaymentRequest;

pub const PAYLOAD_SCHEME: &str = "rentpay";

#[derive(Debug, Clone, Error)]
pub enum QrError {
    #[error("Not a {PAYLOAD_SCHEME} payload: {0}")]
    InvalidScheme(String),
    #[error("The payload does not contain a request id: {0}")]
    MissingRequestId(String),
    #[error("Could not render the QR image. {0}")]
    RenderError(String),
}

/// Encodes the request into its scannable payload. Call only after the row exists, since the
/// payload embeds the row's own id.
pub fn encode_payload(request: &PaymentRequest) -> String {
    let mut payload = format!("{PAYLOAD_SCHEME}://request/{}", request.id);
    let _ = write!(
        payload,
        "?amount={}&currency=UGX&provider={}&account={}",
        request.amount.value(),
        request.provider.slug(),
        request.account_number
    );
    payload
}

/// Extracts the request id from a payload produced by [`encode_payload`].
pub fn decode_payload(payload: &str) -> Result<i64, QrError> {
    let rest = payload
        .strip_prefix(PAYLOAD_SCHEME)
        .and_then(|s| s.strip_prefix("://request/"))
        .ok_or_else(|| QrError::InvalidScheme(payload.to_string()))?;
    let id = rest.split('?').next().unwrap_or_default();
    id.parse::<i64>().map_err(|_| QrError::MissingRequestId(payload.to_string()))
}

/// Renders the payload as a dense unicode QR image, scannable straight off a terminal or embedded
/// in a text response.
pub fn render_image(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload).map_err(|e| QrError::RenderError(e.to_string()))?;
    let image = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    Ok(image)
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use rpg_common::Ugx;

    use super::*;
    use crate::db_types::{PaymentRequest, Provider, RequestStatus};

    fn request(id: i64) -> PaymentRequest {
        let now = Utc::now();
        PaymentRequest {
            id,
            unit_id: 4,
            tenant_id: Some(9),
            payer_id: 2,
            amount: Ugx::from(300_000),
            account_number: "ACC-0042".into(),
            provider: Provider::Airtel,
            payload: String::new(),
            status: RequestStatus::Active,
            expires_at: now,
            used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn payload_round_trip() {
        let req = request(1234);
        let payload = encode_payload(&req);
        assert!(payload.starts_with("rentpay://request/1234?"));
        assert!(payload.contains("provider=airtel_money"));
        assert_eq!(decode_payload(&payload).unwrap(), 1234);
    }

    #[test]
    fn decode_rejects_foreign_payloads() {
        assert!(matches!(decode_payload("https://example.com/pay/12"), Err(QrError::InvalidScheme(_))));
        assert!(matches!(decode_payload("rentpay://request/abc?x=1"), Err(QrError::MissingRequestId(_))));
    }

    #[test]
    fn rendering_produces_an_image() {
        let payload = encode_payload(&request(7));
        let image = render_image(&payload).unwrap();
        assert!(!image.is_empty());
    }
}
