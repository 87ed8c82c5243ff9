//! slipwayd — the Slipway daemon.
//!
//! Single binary that assembles all Slipway subsystems:
//! - Version registry (redb)
//! - Bundle store (content-addressed, on disk)
//! - Progress hub (per-deployment broadcasters)
//! - Release orchestrator + deploy API client
//! - REST API
//!
//! # Usage
//!
//! ```text
//! slipwayd serve --port 8070 --data-dir /var/lib/slipway
//! ```
//!
//! Flags override values from `slipway.toml` when both are given.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use slipway_core::SlipwayConfig;
use slipway_progress::{ProgressHub, ProgressSettings};
use slipway_release::{HttpDeployApi, Orchestrator};

#[derive(Parser)]
#[command(name = "slipwayd", about = "Slipway release orchestration daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon.
    Serve {
        /// Path to slipway.toml. Missing file falls back to defaults.
        #[arg(long, default_value = "slipway.toml")]
        config: PathBuf,

        /// Port to listen on (overrides config).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the registry and bundle store (overrides config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Base URL of the hosting platform's deploy API (overrides config).
        #[arg(long)]
        deploy_url: Option<String>,

        /// Bearer token for the deploy API (overrides config).
        #[arg(long)]
        deploy_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slipwayd=debug,slipway=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
            deploy_url,
            deploy_token,
        } => {
            let mut config = if config.is_file() {
                SlipwayConfig::from_file(&config)?
            } else {
                SlipwayConfig::default()
            };
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir.display().to_string();
            }
            if let Some(deploy_url) = deploy_url {
                config.deploy.base_url = deploy_url;
            }
            if let Some(deploy_token) = deploy_token {
                config.deploy.token = Some(deploy_token);
            }
            serve(config).await
        }
    }
}

async fn serve(config: SlipwayConfig) -> anyhow::Result<()> {
    info!("slipway daemon starting");

    // Ensure data directory exists.
    let data_dir = PathBuf::from(&config.server.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    // ── Initialize subsystems ──────────────────────────────────

    // Version registry.
    let registry_path = data_dir.join("registry.redb");
    let registry = slipway_registry::Registry::open(&registry_path)?;
    info!(path = ?registry_path, "registry opened");

    // Bundle store.
    let bundle_dir = data_dir.join("bundles");
    let bundles = slipway_bundle::BundleStore::open(&bundle_dir)?;
    info!(path = ?bundle_dir, "bundle store opened");

    // Progress hub.
    let hub = ProgressHub::new(ProgressSettings {
        keepalive: Duration::from_secs(config.progress.keepalive_secs),
        max_session: Duration::from_secs(config.progress.max_session_secs),
        linger: Duration::from_secs(config.progress.linger_secs),
    });
    info!("progress hub initialized");

    // Reap exited broadcasters periodically.
    let reaper_hub = hub.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            reaper_hub.reap().await;
        }
    });

    // Deploy API client.
    let deploy = Arc::new(HttpDeployApi::new(
        &config.deploy.base_url,
        config.deploy.token.as_deref(),
    ));
    info!(base_url = %config.deploy.base_url, "deploy api client ready");

    // Release orchestrator.
    let orchestrator = Orchestrator::new(
        registry,
        bundles,
        deploy,
        hub,
        Duration::from_secs(config.deploy.step_timeout_secs),
    );

    // ── REST API ───────────────────────────────────────────────

    let router = slipway_api::build_router(orchestrator);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "api listening");

    axum_serve(listener, router).await?;
    info!("slipway daemon stopped");
    Ok(())
}

async fn axum_serve(listener: tokio::net::TcpListener, router: axum::Router) -> anyhow::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
