//! Types for notification delivery.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// A file sent along with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Where the file lives on disk.
    pub path: PathBuf,
    /// Name the recipient sees.
    pub file_name: String,
    /// MIME type, e.g. `application/pdf`.
    pub content_type: String,
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subject line. Chat channels ignore it.
    pub subject: String,
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    /// A plain text notification without subject or attachment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            subject: String::new(),
            text: text.into(),
            attachment: None,
        }
    }
}

/// Errors that can occur while delivering a notification.
///
/// Delivery failures are per lot: logged, never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Delivery rejected by {channel}: {reason}")]
    Rejected { channel: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::ConnectionFailed(e.to_string())
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Channel name for logs and metrics.
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Read an attachment's bytes.
pub(crate) async fn read_attachment(attachment: &Attachment) -> Result<Vec<u8>, DeliveryError> {
    tokio::fs::read(&attachment.path)
        .await
        .map_err(|source| DeliveryError::Attachment {
            path: attachment.path.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_notification() {
        let n = Notification::text("hello");
        assert_eq!(n.text, "hello");
        assert!(n.subject.is_empty());
        assert!(n.attachment.is_none());
    }

    #[tokio::test]
    async fn test_read_missing_attachment() {
        let attachment = Attachment {
            path: PathBuf::from("/definitely/not/here.pdf"),
            file_name: "x.pdf".to_string(),
            content_type: "application/pdf".to_string(),
        };
        let err = read_attachment(&attachment).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Attachment { .. }));
    }

    #[test]
    fn test_rejected_display() {
        let err = DeliveryError::Rejected {
            channel: "telegram".to_string(),
            reason: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Delivery rejected by telegram: Bad Request: chat not found"
        );
    }
}
