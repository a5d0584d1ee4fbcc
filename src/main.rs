//! grafana-ntfy - Grafana alert webhook relay for ntfy
//!
//! Receives Grafana webhook contact point notifications and republishes them
//! as ntfy messages with "Open in Grafana" and "Silence" action buttons.

use anyhow::Result;
use clap::Parser;
use grafana_ntfy::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_logging("info");
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    init_logging(&config.log_level);

    info!("grafana-ntfy starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!(
        "ntfy URL: {}",
        config.ntfy_url.as_deref().unwrap_or("(per request)")
    );
    info!(
        "Authentication: {}",
        if config.credentials().is_some() {
            "Basic"
        } else {
            "None"
        }
    );
    info!("Allow Insecure TLS: {}", config.allow_insecure);
    info!("Listen Address: {}", config.listen_addr);
    if let Some(timeout) = config.request_timeout_seconds {
        info!("Request Timeout: {}s", timeout);
    }
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            config.metrics.listen_address.to_string()
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let app = match App::builder(config).build(shutdown_rx).await {
        Ok(app) => app,
        Err(e) => {
            error!("server startup error: {:#}", e);
            std::process::exit(1);
        }
    };

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Shutting down gracefully...");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                // Dropping the sender would stop the server; keep it alive.
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    app.run().await
}
