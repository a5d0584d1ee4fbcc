//! Command-Line Interface (CLI) argument parsing.
//!
//! These arguments are parsed at startup and merged on top of the config
//! file and environment variables, so a flag always wins.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Relays Grafana alert webhooks to ntfy.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The ntfy url including the topic, e.g. https://ntfy.sh/mytopic.
    /// Without it, each request passes its destination as ?url=.
    #[arg(long, value_name = "URL")]
    pub ntfy_url: Option<String>,

    /// The ntfy username.
    #[arg(long)]
    pub username: Option<String>,

    /// The ntfy password.
    #[arg(long)]
    pub password: Option<String>,

    /// Allow insecure connections to the ntfy url.
    #[arg(long)]
    pub allow_insecure: bool,

    /// The address to listen on.
    #[arg(long = "addr", value_name = "ADDR")]
    pub listen_addr: Option<String>,

    /// DEPRECATED. Use --addr. The port to listen on.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Print extra debug information.
    #[arg(long)]
    pub debug: bool,

    /// Expose Prometheus metrics.
    #[arg(long)]
    pub metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        let strings = [
            ("ntfy_url", &self.ntfy_url),
            ("username", &self.username),
            ("password", &self.password),
            ("listen_addr", &self.listen_addr),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                dict.insert(key.into(), Value::from(value.clone()));
            }
        }

        if let Some(port) = self.port {
            dict.insert("port".into(), Value::from(u64::from(port)));
        }

        // Boolean flags can only switch things on; absence defers to the
        // lower layers.
        if self.allow_insecure {
            dict.insert("allow_insecure".into(), Value::from(true));
        }
        if self.debug {
            dict.insert("log_level".into(), Value::from("debug".to_string()));
        }
        if self.metrics {
            let mut metrics = Dict::new();
            metrics.insert("enabled".into(), Value::from(true));
            dict.insert("metrics".into(), Value::Dict(Tag::Default, metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
