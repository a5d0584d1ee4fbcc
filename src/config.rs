//! Configuration management for grafana-ntfy
//!
//! This module defines the main `Config` struct. It uses the `figment` crate to
//! layer built-in defaults, an optional TOML file, `GRAFANA_NTFY_*`
//! environment variables and command-line arguments, in that order.

use crate::cli::Cli;
use crate::endpoint::{ResolutionError, Routing};
use crate::notification::Credentials;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

/// The listen address used when nothing else is configured.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PORT: u16 = 8080;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The ntfy url including the topic, e.g. `https://ntfy.sh/mytopic`.
    /// When unset, each request names its destination via `?url=`.
    pub ntfy_url: Option<String>,
    /// Static ntfy username, sent as HTTP Basic authentication.
    pub username: Option<String>,
    /// Static ntfy password.
    pub password: Option<String>,
    /// Accept invalid TLS certificates from ntfy.
    pub allow_insecure: bool,
    /// The address to listen on. `:PORT` binds all interfaces.
    pub listen_addr: String,
    /// Deprecated. Only honoured while `listen_addr` is left at its default.
    pub port: Option<u16>,
    /// The logging level for the application.
    pub log_level: String,
    /// Timeout for requests to ntfy. Unset keeps the HTTP client default.
    pub request_timeout_seconds: Option<u64>,
    /// Configuration for the Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ntfy_url: None,
            username: None,
            password: None,
            allow_insecure: false,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            port: None,
            log_level: "info".to_string(),
            request_timeout_seconds: None,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration by layering defaults, the config file named on
    /// the command line, environment variables and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            // e.g. GRAFANA_NTFY_NTFY_URL=https://ntfy.sh/alerts, GRAFANA_NTFY_METRICS__ENABLED=true
            .merge(Env::prefixed("GRAFANA_NTFY_").split("__"))
            .merge(cli)
            .extract()
            .context("failed to load configuration")?;
        Ok(config)
    }

    /// Resolves the routing mode. A configured `ntfy_url` that does not
    /// resolve is a startup error.
    pub fn routing(&self) -> Result<Routing, ResolutionError> {
        Routing::from_config(self.ntfy_url.as_deref())
    }

    /// The static credentials, if a username is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        Some(Credentials {
            username: username.to_string(),
            password: self.password.clone().unwrap_or_default(),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    /// The socket address the relay listens on.
    pub fn listen_socket_addr(&self) -> Result<SocketAddr> {
        if let Some(port) = self.port.filter(|p| *p != DEFAULT_PORT) {
            if self.listen_addr == DEFAULT_LISTEN_ADDR {
                warn!("Using deprecated port option. Please use listen_addr (--addr) instead");
                return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
            }
        }
        parse_listen_addr(&self.listen_addr)
    }
}

/// Parses a listen address, accepting the `:PORT` shorthand for all interfaces.
fn parse_listen_addr(raw: &str) -> Result<SocketAddr> {
    let raw = raw.trim();
    let full = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    };
    full.parse()
        .with_context(|| format!("invalid listen address {raw:?}"))
}
