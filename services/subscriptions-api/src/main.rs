//! Subscriptions service
//!
//! One binary, three sub-commands:
//!
//! - `serve` - HTTP (axum) and gRPC (tonic) facades over the subscription
//!   engine
//! - `jobs`  - the three batch workers (auto-renewal, pending-payment
//!   cleanup, expiration sweep) in one process
//! - `version` - print version information
//!
//! ## REST Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /subscription-types` - List catalog entries
//! - `POST /subscriptions` - Create (or update in place) a subscription
//! - `GET /subscriptions` - List subscriptions
//! - `GET /subscriptions/{id}` - Get a subscription
//! - `PATCH /subscriptions/{id}` - Update auto-renew and/or status
//! - `DELETE /subscriptions/{id}` - Soft-delete a subscription
//! - `POST /subscriptions/{id}/cancel` - Stop auto-renewal
//! - `POST /webhooks/payment-callback` - Payment gateway callback
//!
//! ## gRPC Service
//!
//! Implements `SubscriptionsService` from subtrack-proto, mirroring the
//! REST surface.

mod auth;
mod config;
mod dto;
mod error;
mod grpc;
mod handlers;
mod jobs;
mod serve;
mod state;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use subtrack_core::{PaymentCallbackService, StubProvider, SubscriptionService};
use subtrack_db::mysql::Repositories;
use subtrack_db::SubscriptionRepository;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "subscriptions-api",
    version,
    about = "Subscription lifecycle service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and gRPC servers
    Serve,
    /// Run all three batch workers (auto-renewal, pending-payment cleanup,
    /// expiration sweep)
    Jobs,
    /// Print the version and build information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("subscriptions-service {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env()?;
    init_tracing(&config);

    tracing::info!(service = %config.service_name, "Starting subscriptions service");

    match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Jobs => jobs::run(config).await,
        Commands::Version => unreachable!("handled before config load"),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wire the engine and callback service to MySQL-backed repositories and the
/// payment provider. Shared by `serve` and `jobs`.
async fn build_services(
    config: &Config,
) -> anyhow::Result<(SubscriptionService, PaymentCallbackService)> {
    let pool = subtrack_db::create_pool(&config.mysql_dsn, &config.pool).await?;
    tracing::info!("Database pool created");

    let repos = Repositories::new(pool);
    let subscriptions: Arc<dyn SubscriptionRepository> = Arc::new(repos.subscriptions);

    let engine = SubscriptionService::new(
        subscriptions.clone(),
        Arc::new(repos.subscription_types),
        Arc::new(repos.plan_types),
        Arc::new(StubProvider::new()),
        config.engine.clone(),
    );
    let callbacks = PaymentCallbackService::new(subscriptions, config.engine.clone());

    Ok((engine, callbacks))
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
