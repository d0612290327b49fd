//! Batch worker loop
//!
//! Each batch job runs as a long-lived worker: one iteration immediately at
//! startup, then one per tick, until shutdown is signaled. Shutdown is
//! acknowledged between iterations, never mid-job.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::EngineResult;

/// Drive a batch job on a fixed interval until `shutdown` flips to true.
pub async fn run_worker<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = EngineResult<()>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(job = name, interval_secs = interval.as_secs(), "worker started");

    loop {
        tokio::select! {
            _ = ticker.tick() => run_job(name, &job).await,
            _ = shutdown.changed() => {
                tracing::info!(job = name, "worker shutdown requested");
                return;
            }
        }
    }
}

async fn run_job<F, Fut>(name: &'static str, job: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = EngineResult<()>>,
{
    let start = Instant::now();
    let result = job().await;
    let latency = start.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(job = name, latency_ms = latency.as_millis() as u64, "job_completed");
            metrics::counter!("batch_job_runs_total", "job" => name, "result" => "ok")
                .increment(1);
        }
        Err(err) => {
            tracing::error!(
                job = name,
                error = %err,
                latency_ms = latency.as_millis() as u64,
                "job_failed"
            );
            metrics::counter!("batch_job_runs_total", "job" => name, "result" => "err")
                .increment(1);
        }
    }
}
