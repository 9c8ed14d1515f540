//! SMTP dispatcher for the application email.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::EmailConfig;

use super::types::read_attachment;
use super::{DeliveryError, Dispatcher, Notification};

/// Sends mail over SMTP with STARTTLS and login credentials.
pub struct EmailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailDispatcher {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(config.sender())?;
        let to = parse_mailbox(&config.to)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs as u64)))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    async fn build_message(&self, notification: &Notification) -> Result<Message, DeliveryError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone());
        let body = SinglePart::plain(notification.text.clone());

        let message = match &notification.attachment {
            Some(attachment) => {
                let data = read_attachment(attachment).await?;
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| DeliveryError::Message(e.to_string()))?;
                let file =
                    MailAttachment::new(attachment.file_name.clone()).body(data, content_type);
                builder.multipart(MultiPart::mixed().singlepart(body).singlepart(file))
            }
            None => builder.singlepart(body),
        };

        message.map_err(|e| DeliveryError::Message(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|e| DeliveryError::InvalidAddress(format!("{:?}: {}", address, e)))
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let message = self.build_message(notification).await?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        debug!(to = %self.to, subject = %notification.subject, "Email sent");
        Ok(())
    }
}
