//! The `jobs` sub-command: all three batch workers in one process.
//!
//! Each worker ticks on its own interval; a deployment is expected to run a
//! single instance of this command (duplicate payment attempts are not
//! idempotent at the provider).

use std::sync::Arc;

use tokio::sync::watch;

use subtrack_core::workers::run_worker;

use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let (engine, _callbacks) = crate::build_services(&config).await?;
    let engine = Arc::new(engine);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let renew = {
        let engine = engine.clone();
        tokio::spawn(run_worker(
            "renew",
            config.jobs.auto_renew_interval,
            shutdown_rx.clone(),
            move || {
                let engine = engine.clone();
                async move { engine.run_auto_renewal_batch().await }
            },
        ))
    };

    let pending_cleanup = {
        let engine = engine.clone();
        tokio::spawn(run_worker(
            "pending_cleanup",
            config.jobs.pending_cleanup_interval,
            shutdown_rx.clone(),
            move || {
                let engine = engine.clone();
                async move { engine.run_pending_payment_cleanup_batch().await }
            },
        ))
    };

    let expiration = {
        let engine = engine.clone();
        tokio::spawn(run_worker(
            "expiration",
            config.jobs.expiration_check_interval,
            shutdown_rx,
            move || {
                let engine = engine.clone();
                async move { engine.run_expiration_batch().await }
            },
        ))
    };

    crate::shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(renew, pending_cleanup, expiration);
    tracing::info!("Workers stopped");

    Ok(())
}
