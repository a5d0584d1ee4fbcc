//! # Relay Server
//!
//! The `axum` server that receives Grafana webhooks and forwards them to ntfy.
//! Every path is served by the same handler. Only `POST` is accepted.

use crate::core::AlertGroup;
use crate::endpoint::{ResolutionError, Routing};
use crate::formatting::{prepare_notification, priority_from_hint};
use crate::internal_metrics::Metrics;
use crate::notification::{Credentials, DeliveryError, NotificationSender};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Body returned for every successfully relayed webhook.
pub const SUCCESS_BODY: &str = "Payload received successfully\n";

/// Shared, read-only state of the relay handler.
pub struct RelayState {
    pub routing: Routing,
    pub credentials: Option<Credentials>,
    pub sender: Arc<dyn NotificationSender>,
    pub metrics: Metrics,
}

/// Query parameters understood by the relay.
///
/// The destination `url` is not listed here. Form decoding would turn a `+`
/// in the topic into a space, so it is read verbatim by [`url_param`].
#[derive(Debug, Default, Deserialize)]
pub struct RelayParams {
    /// ntfy priority hint, `1` to `5`.
    pub priority: Option<String>,
}

/// The raw value of the first `url` parameter in `query`.
///
/// No percent or `+` decoding is applied, so a destination passed as
/// `?url=https://ntfy.sh/team+a` resolves exactly like the same string in the
/// static configuration. The value ends at the next `&`.
pub fn url_param(query: Option<&str>) -> Option<&str> {
    query?.split('&').find_map(|pair| pair.strip_prefix("url="))
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("invalid request method {0}")]
    MethodNotAllowed(Method),

    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("authorization header is not valid UTF-8")]
    InvalidAuthorization,

    #[error("invalid alert payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Query(_)
            | RelayError::Resolution(_)
            | RelayError::InvalidAuthorization
            | RelayError::Payload(_) => StatusCode::BAD_REQUEST,
            RelayError::Delivery(DeliveryError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Delivery(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// A short identifier, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed(_) => "method",
            RelayError::Query(_) => "query",
            RelayError::Resolution(_) => "ntfy_url",
            RelayError::InvalidAuthorization => "authorization",
            RelayError::Payload(_) => "payload",
            RelayError::Delivery(DeliveryError::Encoding(_)) => "encoding",
            RelayError::Delivery(DeliveryError::Transport(_)) => "transport",
            RelayError::Delivery(DeliveryError::Rejected { .. }) => "rejected",
        }
    }

    /// The message returned to the caller. Details stay in the logs.
    fn public_message(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed(_) => "Invalid request method",
            RelayError::Query(_) => "Error parsing query string",
            RelayError::Resolution(_) => "Error parsing ntfy-url",
            RelayError::InvalidAuthorization => "Invalid Authorization header",
            RelayError::Payload(_) => "Error parsing JSON payload",
            RelayError::Delivery(_) => "Error sending notification",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "{}", self.public_message());
        } else {
            warn!(error = %self, "{}", self.public_message());
        }
        (status, format!("{}\n", self.public_message())).into_response()
    }
}

/// Handles one inbound webhook.
#[instrument(skip_all, fields(method = %method))]
pub async fn relay(
    State(state): State<Arc<RelayState>>,
    method: Method,
    uri: Uri,
    query: Result<Query<RelayParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    let result = if method == Method::POST {
        state.metrics.notifications_received_total.increment(1);
        forward(&state, &uri, query, &headers, &body).await
    } else {
        Err(RelayError::MethodNotAllowed(method))
    };

    match &result {
        Ok(()) => state.metrics.notifications_forwarded_total.increment(1),
        Err(e) => state.metrics.increment_failed(e.reason()),
    }
    result.map(|()| SUCCESS_BODY)
}

async fn forward(
    state: &RelayState,
    uri: &Uri,
    query: Result<Query<RelayParams>, QueryRejection>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), RelayError> {
    let Query(params) = query?;
    let endpoint = state.routing.endpoint_for(url_param(uri.query()))?;

    let group: AlertGroup = serde_json::from_slice(body)?;
    debug!(
        topic = endpoint.topic(),
        alerts = group.alerts.len(),
        status = %group.status,
        "Received alert group"
    );

    // Static routing leaves priority to ntfy unless the caller asks for one.
    let priority = (state.routing.is_dynamic() || params.priority.is_some())
        .then(|| priority_from_hint(params.priority.as_deref()));
    let notification = prepare_notification(&group, endpoint.topic(), priority);

    // A header that is not visible ASCII is rejected, not replaced by static credentials.
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| RelayError::InvalidAuthorization)?;

    let started = Instant::now();
    let delivered = state
        .sender
        .deliver(
            &notification,
            endpoint.base_url(),
            authorization,
            state.credentials.as_ref(),
        )
        .await;
    state.metrics.record_delivery(started.elapsed());
    delivered?;

    info!(topic = endpoint.topic(), "Forwarded notification to ntfy");
    Ok(())
}

/// Builds the relay router.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new().fallback(relay).with_state(state)
}

/// The relay's HTTP server.
pub struct RelayServer {
    listener: TcpListener,
    state: Arc<RelayState>,
    shutdown_rx: watch::Receiver<()>,
}

impl RelayServer {
    /// Creates a new `RelayServer` on an already bound listener.
    pub fn new(
        listener: TcpListener,
        state: Arc<RelayState>,
        shutdown_rx: watch::Receiver<()>,
    ) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Serves requests until the shutdown channel fires or its sender is dropped.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx;
        let shutdown = async move {
            let _ = shutdown_rx.changed().await;
            info!("Relay server received shutdown signal.");
        };

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("relay server crashed")
    }
}
