//! Mock notification dispatcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notify::{DeliveryError, Dispatcher, Notification};

/// A delivery seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub notification: Notification,
    /// Whether the attachment file existed when `send` was called.
    pub attachment_present: bool,
}

/// Mock implementation of the Dispatcher trait.
///
/// Records every notification and can be told to fail.
#[derive(Debug, Clone)]
pub struct MockDispatcher {
    name: String,
    sent: Arc<RwLock<Vec<RecordedDelivery>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl MockDispatcher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sent: Arc::new(RwLock::new(Vec::new())),
            fail_all: Arc::new(RwLock::new(false)),
        }
    }

    /// Make every send fail (after recording it) until reset.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_all.write().await = failing;
    }

    pub async fn sent(&self) -> Vec<RecordedDelivery> {
        self.sent.read().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }

    /// Texts of all recorded notifications.
    pub async fn texts(&self) -> Vec<String> {
        self.sent
            .read()
            .await
            .iter()
            .map(|d| d.notification.text.clone())
            .collect()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let attachment_present = notification
            .attachment
            .as_ref()
            .is_some_and(|a| a.path.exists());

        self.sent.write().await.push(RecordedDelivery {
            notification: notification.clone(),
            attachment_present,
        });

        if *self.fail_all.read().await {
            return Err(DeliveryError::Rejected {
                channel: self.name.clone(),
                reason: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}
