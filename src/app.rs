//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    endpoint::Routing,
    internal_metrics::{server::MetricsServer, MetricsBuilder},
    notification::{NotificationSender, NtfyClient},
    server::{RelayServer, RelayState},
};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument};

/// A fully wired relay, ready to serve.
pub struct App {
    relay: RelayServer,
    local_addr: SocketAddr,
    metrics_server: Option<(MetricsServer, SocketAddr)>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the relay is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_server.as_ref().map(|(_, addr)| *addr)
    }

    /// Serves until the shutdown channel passed to [`AppBuilder::build`] fires.
    pub async fn run(self) -> Result<()> {
        if let Some((server, addr)) = self.metrics_server {
            info!(%addr, "Metrics server listening");
            tokio::spawn(server.run());
        }

        info!(addr = %self.local_addr, "Relay listening");
        self.relay.run().await?;

        info!("Relay shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Tests use the overrides to inject a mock sender or a listener bound to an
/// ephemeral port.
pub struct AppBuilder {
    config: Config,
    sender_override: Option<Arc<dyn NotificationSender>>,
    listener_override: Option<TcpListener>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sender_override: None,
            listener_override: None,
        }
    }

    /// Overrides the ntfy client for testing.
    pub fn sender_override(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.sender_override = Some(sender);
        self
    }

    /// Serves on an already bound listener instead of `listen_addr`.
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener_override = Some(listener);
        self
    }

    /// Resolves the routing, builds the ntfy client and binds the listener.
    ///
    /// A configured ntfy url that does not resolve fails the build.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<()>) -> Result<App> {
        let config = self.config;

        let routing = config.routing().context("Error parsing ntfy-url")?;
        match &routing {
            Routing::Static(spec) => info!(
                server_url = spec.base_url(),
                topic = spec.topic(),
                "Using static ntfy destination"
            ),
            Routing::Dynamic => {
                info!("No ntfy url configured, routing each request by its url parameter")
            }
        }

        let sender = match self.sender_override {
            Some(sender) => sender,
            None => Arc::new(
                NtfyClient::new(config.allow_insecure, config.request_timeout())
                    .context("failed to build HTTP client")?,
            ),
        };

        let (metrics, metrics_server) =
            MetricsBuilder::new(config.metrics.clone()).build(shutdown_rx.clone());

        let listener = match self.listener_override {
            Some(listener) => listener,
            None => {
                let addr = config.listen_socket_addr()?;
                TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("failed to bind {addr}"))?
            }
        };
        let local_addr = listener.local_addr()?;

        let state = Arc::new(RelayState {
            routing,
            credentials: config.credentials(),
            sender,
            metrics,
        });

        Ok(App {
            relay: RelayServer::new(listener, state, shutdown_rx),
            local_addr,
            metrics_server,
        })
    }
}
