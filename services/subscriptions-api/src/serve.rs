//! The `serve` sub-command: HTTP + gRPC servers.

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::sync::watch;
use tonic::transport::Server as TonicServer;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use subtrack_proto::subscriptions_service::subscriptions_service_server::SubscriptionsServiceServer;

use crate::auth::AuthVerifier;
use crate::config::Config;
use crate::grpc::GrpcSubscriptionsService;
use crate::handlers;
use crate::state::AppState;

/// Per-request handler timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long in-flight work may keep running after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(config: Config) -> anyhow::Result<()> {
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let (engine, callbacks) = crate::build_services(&config).await?;
    let auth = AuthVerifier::new(&config.auth_grpc_addr);

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;
    let grpc_addr: SocketAddr = format!("{}:{}", config.grpc_host, config.grpc_port).parse()?;

    let state = AppState::new(engine, callbacks, auth, config);
    let app = build_router(state.clone(), metrics_handle);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        crate::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    tokio::try_join!(
        run_http_server(app, http_addr, shutdown_rx.clone()),
        run_grpc_server(state, grpc_addr, shutdown_rx),
    )?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Authenticated API routes
    let api = Router::new()
        .route("/subscription-types", get(handlers::list_subscription_types))
        .route(
            "/subscriptions",
            post(handlers::create_subscription).get(handlers::list_subscriptions),
        )
        .route(
            "/subscriptions/{id}",
            get(handlers::get_subscription)
                .patch(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .route(
            "/subscriptions/{id}/cancel",
            post(handlers::cancel_subscription),
        )
        .route(
            "/webhooks/payment-callback",
            post(handlers::payment_callback),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_api_key,
        ));

    // Health route: no auth, no timeout - must always respond quickly
    let health_route = Router::new().route("/health", get(handlers::health));

    // Metrics route: no auth, no timeout
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    Router::new()
        .merge(api)
        .layer(middleware)
        .merge(health_route)
        .merge(metrics_route)
        .with_state(state)
}

async fn run_http_server(
    app: Router,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    let mut graceful_rx = shutdown.clone();
    let serve_fut = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = graceful_rx.changed().await;
            })
            .await
    };
    tokio::pin!(serve_fut);

    let mut shutdown = shutdown;
    tokio::select! {
        result = &mut serve_fut => result?,
        _ = shutdown.changed() => {
            // Stop accepting; in-flight requests get a bounded drain window
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut serve_fut).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!("HTTP drain window elapsed before all connections closed");
                }
            }
        }
    }

    Ok(())
}

async fn run_grpc_server(
    state: AppState,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    tracing::info!("gRPC server listening on {}", addr);

    let grpc_service = GrpcSubscriptionsService::new(state.engine.clone(), state.callbacks.clone());
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(subtrack_proto::subtrack::v1::FILE_DESCRIPTOR_SET)
        .build()?;

    let mut graceful_rx = shutdown.clone();
    let serve_fut = async move {
        TonicServer::builder()
            .add_service(reflection)
            .add_service(SubscriptionsServiceServer::new(grpc_service))
            .serve_with_shutdown(addr, async move {
                let _ = graceful_rx.changed().await;
            })
            .await
    };
    tokio::pin!(serve_fut);

    let mut shutdown = shutdown;
    tokio::select! {
        result = &mut serve_fut => result?,
        _ = shutdown.changed() => {
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut serve_fut).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!("gRPC drain window elapsed before all requests completed");
                }
            }
        }
    }

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Most operations are single-row lookups; payment-bearing calls dominate
    // the tail
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("subscription_operation_duration_seconds".to_string()),
        latency_buckets,
    )?;

    let handle = builder.install_recorder()?;

    metrics::describe_counter!(
        "subscriptions_created_total",
        "Total subscriptions created or updated in place"
    );
    metrics::describe_counter!(
        "subscriptions_canceled_total",
        "Total subscriptions canceled"
    );
    metrics::describe_counter!(
        "payment_callbacks_total",
        "Total payment callbacks processed by status"
    );
    metrics::describe_counter!(
        "subscription_renewals_total",
        "Total auto-renewal attempts by result"
    );
    metrics::describe_counter!(
        "batch_job_runs_total",
        "Total batch job iterations by job and result"
    );
    metrics::describe_histogram!(
        "subscription_operation_duration_seconds",
        "Subscription operation latency in seconds by operation"
    );

    Ok(handle)
}
