use async_trait::async_trait;
use thiserror::Error;

/// The outbound notification collaborator (SMS, email, push - the engine does not care which).
///
/// Notification failures must never roll back a payment state transition, so callers log errors
/// from [`Notifier::send`] and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("The notification channel is unavailable. {0}")]
    ChannelUnavailable(String),
    #[error("The notification was rejected. {0}")]
    Rejected(String),
}
