//! SES v2 email notifier.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use finwatch_abstraction::{EmailMessage, Notifier, NotifyError};
use tracing::info;

use super::describe_sdk_error;

const CHARSET: &str = "UTF-8";

/// Sends plain-text email through Amazon SES v2.
#[derive(Debug, Clone)]
pub struct SesNotifier {
    client: aws_sdk_sesv2::Client,
}

impl SesNotifier {
    /// Creates a notifier from a loaded SDK configuration.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self { client: aws_sdk_sesv2::Client::new(sdk_config) }
    }

    /// Wraps an existing SES v2 client.
    #[must_use]
    pub const fn from_client(client: aws_sdk_sesv2::Client) -> Self {
        Self { client }
    }
}

fn text(data: &str) -> Result<Content, NotifyError> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| NotifyError::InvalidMessage(e.to_string()))
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if message.to.trim().is_empty() {
            return Err(NotifyError::InvalidMessage("empty recipient".to_string()));
        }

        let content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(text(&message.subject)?)
                    .body(Body::builder().text(text(&message.body)?).build())
                    .build(),
            )
            .build();

        let response = self
            .client
            .send_email()
            .from_email_address(&message.from)
            .destination(Destination::builder().to_addresses(&message.to).build())
            .content(content)
            .send()
            .await
            .map_err(|e| NotifyError::Dispatch {
                recipient: message.to.clone(),
                message: describe_sdk_error(&e),
            })?;

        info!(
            recipient = %message.to,
            message_id = response.message_id().unwrap_or_default(),
            "Email dispatched"
        );
        Ok(())
    }
}
