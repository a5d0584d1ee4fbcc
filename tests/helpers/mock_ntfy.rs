//! A mock ntfy sender for testing the HTTP layer without a network.

use async_trait::async_trait;
use grafana_ntfy::core::Notification;
use grafana_ntfy::notification::{Credentials, DeliveryError, NotificationSender};
use std::sync::{Arc, Mutex};

/// One recorded call to [`NotificationSender::deliver`].
#[derive(Clone, Debug)]
pub struct Delivery {
    pub notification: Notification,
    pub endpoint: String,
    pub authorization_header: Option<String>,
    pub credentials: Option<Credentials>,
}

#[derive(Clone, Debug, Default)]
pub struct MockNtfySender {
    pub deliveries: Arc<Mutex<Vec<Delivery>>>,
    reject_with: Option<u16>,
}

impl MockNtfySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail as if ntfy answered with `status`.
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Default::default()
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNtfySender {
    async fn deliver(
        &self,
        notification: &Notification,
        endpoint: &str,
        authorization_header: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(), DeliveryError> {
        self.deliveries.lock().unwrap().push(Delivery {
            notification: notification.clone(),
            endpoint: endpoint.to_string(),
            authorization_header: authorization_header.map(str::to_string),
            credentials: credentials.cloned(),
        });
        match self.reject_with {
            Some(status) => Err(DeliveryError::Rejected { status }),
            None => Ok(()),
        }
    }
}
