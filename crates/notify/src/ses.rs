//! SES-backed notifier

use async_trait::async_trait;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client;

use crate::{content, InvitationNotice, NoticeChannel, Notifier, NotifyError};

pub struct SesNotifier {
    client: Client,
    sender: String,
}

impl SesNotifier {
    pub fn new(client: Client, sender: String) -> Self {
        Self { client, sender }
    }

    fn text_content(data: String) -> Result<Content, NotifyError> {
        Content::builder()
            .data(data)
            .build()
            .map_err(|e| NotifyError::Config(format!("Invalid message content: {}", e)))
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), NotifyError> {
        let recipient = match &notice.channel {
            NoticeChannel::Email(address) => address.clone(),
            NoticeChannel::Phone(_) => {
                // SES delivers email only; SMS needs a separate provider
                return Err(NotifyError::Delivery(
                    "SMS delivery is not configured".to_string(),
                ));
            }
        };

        let destination = Destination::builder().to_addresses(&recipient).build();
        let message = Message::builder()
            .subject(Self::text_content(content::invitation_subject(notice))?)
            .body(
                Body::builder()
                    .text(Self::text_content(content::invitation_body(notice))?)
                    .build(),
            )
            .build();

        self.client
            .send_email()
            .source(&self.sender)
            .destination(destination)
            .message(message)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        tracing::info!(recipient = %recipient, team = %notice.team_name, "Invitation email sent");
        Ok(())
    }
}
