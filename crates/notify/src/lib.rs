//! Outbound notifications for Hackmate
//!
//! Invitation delivery is best-effort: the workflow commits first and then
//! hands a notice to the `Notifier`. A delivery failure is logged by the
//! caller, never surfaced to the API client.

pub mod content;
pub mod mock;
pub mod ses;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use mock::MockNotifier;
pub use ses::SesNotifier;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notifier misconfigured: {0}")]
    Config(String),
}

/// Where an invitation notice should be sent
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeChannel {
    Email(String),
    Phone(String),
}

/// Everything the delivery layer needs to render an invitation message.
/// Deliberately plain data so this crate stays independent of the domain
/// crates.
#[derive(Debug, Clone, PartialEq)]
pub struct InvitationNotice {
    pub channel: NoticeChannel,
    pub team_name: String,
    pub inviter_name: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), NotifyError>;
}

/// Pick a notifier from the environment. SES when a sender address is
/// configured, the logging mock otherwise.
pub async fn notifier_from_env() -> Box<dyn Notifier> {
    match std::env::var("SES_SENDER_ADDRESS") {
        Ok(sender) if !sender.is_empty() => {
            let config = aws_config::load_from_env().await;
            Box::new(SesNotifier::new(aws_sdk_ses::Client::new(&config), sender))
        }
        _ => {
            tracing::info!("SES_SENDER_ADDRESS not set, using mock notifier");
            Box::new(MockNotifier::new())
        }
    }
}
