//! # Internal Metrics Module
//!
//! Counters and histograms describing the relay's traffic, plus an optional
//! Prometheus exporter.
//!
//! - **`MetricsBuilder`**: installs the Prometheus recorder, binds the metrics
//!   listener and constructs the `Metrics` handle.
//! - **`Metrics`**: a cloneable handle the request handler records into.
//! - **`MetricsServer`**: (Defined in `server.rs`) serves `/metrics`.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

pub mod server;

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub notifications_received_total: Counter,
    pub notifications_forwarded_total: Counter,
    pub delivery_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("notifications_received_total", Unit::Count, "Total number of alert webhooks received.");
        metrics::describe_counter!("notifications_forwarded_total", Unit::Count, "Total number of notifications accepted by ntfy.");
        metrics::describe_counter!("notifications_failed_total", Unit::Count, "Total number of webhooks that were not forwarded, labeled by reason.");
        metrics::describe_histogram!("delivery_duration_seconds", Unit::Seconds, "The time taken to deliver a notification to ntfy.");

        Self {
            notifications_received_total: metrics::counter!("notifications_received_total"),
            notifications_forwarded_total: metrics::counter!("notifications_forwarded_total"),
            delivery_duration_seconds: metrics::histogram!("delivery_duration_seconds"),
        }
    }

    /// Increments the failure counter for the given reason.
    pub fn increment_failed(&self, reason: &'static str) {
        metrics::counter!("notifications_failed_total", "reason" => reason).increment(1);
    }

    pub fn record_delivery(&self, elapsed: Duration) {
        self.delivery_duration_seconds.record(elapsed.as_secs_f64());
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Initializes the metrics system and returns a `Metrics` handle and an
    /// optional `MetricsServer` with its bound address.
    ///
    /// Without a recorder installed the `metrics` macros are no-ops, so a
    /// disabled or failed setup still hands out a usable `Metrics`.
    pub fn build(
        self,
        shutdown_rx: watch::Receiver<()>,
    ) -> (Metrics, Option<(MetricsServer, SocketAddr)>) {
        if !self.config.enabled {
            return (Metrics::new(), None);
        }

        let recorder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        ) {
            Ok(builder) => builder.build_recorder(),
            Err(e) => {
                error!("Failed to configure Prometheus recorder: {}", e);
                return (Metrics::new(), None);
            }
        };
        let handle = recorder.handle();

        let listener = match std::net::TcpListener::bind(self.config.listen_address)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            }) {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    "Failed to bind metrics server to {}: {}",
                    self.config.listen_address, e
                );
                return (Metrics::new(), None);
            }
        };

        let (listener, addr) = match TcpListener::from_std(listener)
            .and_then(|listener| listener.local_addr().map(|addr| (listener, addr)))
        {
            Ok(bound) => bound,
            Err(e) => {
                error!("Failed to set up metrics listener: {}", e);
                return (Metrics::new(), None);
            }
        };

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::new(), None);
        }

        let metrics = Metrics::new();
        let server = MetricsServer::new(listener, handle, shutdown_rx);

        (metrics, Some((server, addr)))
    }
}
