//! pms-review - review workflow and notification service
//!
//! Serves the workflow operations, notification endpoints and the live
//! notification stream, and runs the reminder sweep in the background.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pms_common::config::{load_toml_config, resolve_database_path, resolve_port};
use pms_review::services::{HttpMailGateway, LogOnlyGateway, SideChannelGateway, SweeperConfig};
use pms_review::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for pms-review
#[derive(Parser, Debug)]
#[command(name = "pms-review")]
#[command(about = "Review workflow and notification service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PMS_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "PMS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level can apply
    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(&toml_config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pms-review v{}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(args.database.as_deref(), "PMS_DATABASE", &toml_config);
    info!("Database path: {}", db_path.display());

    let pool = pms_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let gateway: Arc<dyn SideChannelGateway> = match &toml_config.mail.relay_url {
        Some(url) => {
            info!("Mail relay: {}", url);
            Arc::new(
                HttpMailGateway::new(
                    url.clone(),
                    Duration::from_secs(toml_config.mail.timeout_secs),
                )
                .context("Failed to build mail client")?,
            )
        }
        None => {
            info!("No mail relay configured, emails are logged only");
            Arc::new(LogOnlyGateway)
        }
    };

    let state = AppState::new(
        pool,
        gateway,
        toml_config.mail.from_address.clone(),
        SweeperConfig::from(&toml_config.reminders),
    );

    state.sweeper.clone().run();

    let app = build_router(state);

    let port = resolve_port(args.port, &toml_config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Expand a bare level into per-crate directives; full directives pass through
fn default_filter(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("pms_review={level},pms_common={level},tower_http={level}")
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_expands_bare_level() {
        assert_eq!(
            default_filter("debug"),
            "pms_review=debug,pms_common=debug,tower_http=debug"
        );
        assert_eq!(default_filter("warn,pms_review=trace"), "warn,pms_review=trace");
    }
}
