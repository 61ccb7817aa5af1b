//! frontdesk-sv - Supervisor escalation service
//!
//! Mediates between an automated front-desk agent and human supervisors:
//! answers known questions from the knowledge base, escalates unknown ones,
//! and delivers supervisor answers back to askers when they are reachable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use frontdesk_common::config::{ConfigOverrides, ServiceConfig};
use frontdesk_sv::poller::ResolutionPoller;
use frontdesk_sv::resolver::ResolverConfig;
use frontdesk_sv::{build_router, db, notify, AppState};

/// Command-line options; every flag can also come from the environment,
/// a TOML config file, or a compiled default.
#[derive(Debug, Parser)]
#[command(name = "frontdesk-sv", version)]
struct Cli {
    /// HTTP bind port
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Outbound webhook URL for supervisor/customer notifications
    #[arg(long)]
    webhook_url: Option<String>,

    /// Resolution poller interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Help-request timeout in minutes
    #[arg(long)]
    request_timeout: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting frontdesk supervisor service (frontdesk-sv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = ServiceConfig::load(ConfigOverrides {
        port: cli.port,
        database_path: cli.database,
        supervisor_webhook_url: cli.webhook_url,
        poll_interval_secs: cli.poll_interval,
        request_timeout_minutes: cli.request_timeout,
    })?;

    info!("Database path: {}", config.database_path.display());
    let pool = db::init_database_pool(&config.database_path).await?;
    db::seed_knowledge(&pool).await?;

    let sink = notify::sink_from_config(config.supervisor_webhook_url.as_deref());
    let resolver = ResolverConfig::new(config.raw_substring_match);
    let state = AppState::new(
        pool.clone(),
        sink.clone(),
        resolver,
        chrono::Duration::minutes(config.request_timeout_minutes),
    );

    // Background settle loop for resolved requests
    let poller = Arc::new(ResolutionPoller::new(
        pool,
        state.sessions.clone(),
        sink,
        Duration::from_secs(config.poll_interval_secs),
    ));
    let poller_task = poller.clone();
    tokio::spawn(async move {
        poller_task.run().await;
    });

    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("frontdesk-sv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    poller.stop().await;
    Ok(())
}
