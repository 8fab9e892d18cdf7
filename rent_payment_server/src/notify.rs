//! Payment-confirmation notifications.
//!
//! The engine emits a `PaymentConfirmedEvent` once a confirmation has been fully applied; the hook
//! installed here formats the customer message and hands it to the [`Notifier`]. Delivery runs on
//! the event handler's own task, and failures are logged only - a dropped SMS never unwinds a
//! settled payment.
use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use rent_payment_engine::{
    events::EventHooks,
    traits::{Notifier, NotifyError},
};

/// Stand-in SMS channel: writes the message to the log. The real gateway integration implements
/// the same [`Notifier`] contract.
#[derive(Default)]
pub struct SmsLogNotifier;

#[async_trait]
impl Notifier for SmsLogNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!("📨️ SMS to {recipient}: {message}");
        Ok(())
    }
}

/// Builds the event hooks that forward payment confirmations to the given notifier.
pub fn confirmation_hooks(notifier: Arc<dyn Notifier>) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_payment_confirmed(move |event| {
        let notifier = Arc::clone(&notifier);
        Box::pin(async move {
            let tx = &event.transaction;
            let message = format!(
                "Payment of {} received for {}. Thank you!",
                tx.amount, tx.reference
            );
            if let Err(e) = notifier.send(&tx.payer_phone, &message).await {
                warn!("📨️ Could not deliver confirmation notification for [{}]. {e}", tx.external_id);
            }
        })
    });
    hooks
}
