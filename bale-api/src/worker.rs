use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use bale_order::FulfillmentScheduler;
use bale_trust::TrustWorker;

use crate::telemetry::Telemetry;

/// Polls the job store and applies every due transition. Jobs left behind by a previous
/// process are picked up on the first tick.
pub async fn run_fulfillment_worker(scheduler: Arc<FulfillmentScheduler>, poll: Duration, telemetry: Arc<Telemetry>) {
    info!(poll_ms = poll.as_millis() as u64, "fulfillment worker started");
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match scheduler.run_due(Utc::now()).await {
            Ok(report) => {
                if report.completed + report.retried + report.dropped > 0 {
                    debug!(?report, "fulfillment tick");
                }
                telemetry.scheduler_run(&report);
            }
            Err(e) => {
                error!(error = %e, "fulfillment tick failed");
                telemetry.async_failure("fulfillment");
            }
        }
    }
}

pub fn spawn_workers(
    scheduler: Arc<FulfillmentScheduler>,
    trust_worker: TrustWorker,
    poll: Duration,
    telemetry: Arc<Telemetry>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_fulfillment_worker(scheduler, poll, telemetry)),
        tokio::spawn(trust_worker.run()),
    ]
}
