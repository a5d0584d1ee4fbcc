//! A client for publishing notifications to ntfy.

use crate::core::Notification;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Failure modes of a single delivery attempt. None of them are retried.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to encode notification: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("HTTP request to ntfy failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ntfy returned status code {status}")]
    Rejected { status: u16 },
}

/// Static ntfy credentials, sent as HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The authentication attached to an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization<'a> {
    /// An `Authorization` header forwarded verbatim from the inbound request.
    Forwarded(&'a str),
    Basic(&'a Credentials),
}

impl<'a> Authorization<'a> {
    /// Picks the authentication for a request. A forwarded header is more
    /// specific than the static credentials and takes precedence.
    pub fn select(
        forwarded_header: Option<&'a str>,
        credentials: Option<&'a Credentials>,
    ) -> Option<Self> {
        match (forwarded_header.filter(|h| !h.is_empty()), credentials) {
            (Some(header), _) => Some(Self::Forwarded(header)),
            (None, Some(credentials)) => Some(Self::Basic(credentials)),
            (None, None) => None,
        }
    }
}

/// A trait for clients that can deliver notifications to ntfy.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Publishes `notification` to `endpoint`.
    async fn deliver(
        &self,
        notification: &Notification,
        endpoint: &str,
        authorization_header: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(), DeliveryError>;
}

/// Publishes notifications through ntfy's JSON endpoint.
#[derive(Clone, Debug)]
pub struct NtfyClient {
    client: reqwest::Client,
}

impl NtfyClient {
    /// Creates a new `NtfyClient`.
    ///
    /// `timeout` of `None` leaves reqwest's default in place.
    pub fn new(allow_insecure: bool, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(allow_insecure);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl NotificationSender for NtfyClient {
    #[instrument(skip_all, fields(endpoint = %endpoint, topic = %notification.topic))]
    async fn deliver(
        &self,
        notification: &Notification,
        endpoint: &str,
        authorization_header: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(notification)?;
        debug!(body = %String::from_utf8_lossy(&body), "Sending notification to ntfy");

        let mut request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        request = match Authorization::select(authorization_header, credentials) {
            Some(Authorization::Forwarded(header)) => request.header(AUTHORIZATION, header),
            Some(Authorization::Basic(credentials)) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "HTTP request to ntfy failed");
            DeliveryError::Transport(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "ntfy rejected the notification");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Notification sent to ntfy");
        Ok(())
    }
}
