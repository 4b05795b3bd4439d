use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use bale_core::repository::JobStore;
use bale_order::{OrderResult, RunReport};
use bale_trust::TrustStatsSnapshot;

use crate::state::AppState;

/// Process-local Prometheus registry.
pub struct Telemetry {
    registry: Registry,
    purchases: IntCounterVec,
    async_failures: IntCounterVec,
    jobs: IntCounterVec,
    pending_jobs: IntGauge,
    trust_queue: IntGaugeVec,
}

impl Telemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let purchases = IntCounterVec::new(
            Opts::new("bale_purchases_total", "Purchase attempts by kind and outcome"),
            &["kind", "outcome"],
        )?;
        let async_failures = IntCounterVec::new(
            Opts::new("bale_async_task_failures_total", "Background task failures"),
            &["task"],
        )?;
        let jobs = IntCounterVec::new(
            Opts::new("bale_scheduled_jobs_total", "Delayed transitions by outcome"),
            &["outcome"],
        )?;
        let pending_jobs = IntGauge::new("bale_scheduled_jobs_pending", "Delayed transitions not yet applied")?;
        let trust_queue = IntGaugeVec::new(
            Opts::new("bale_trust_events", "Trust queue counters since start"),
            &["state"],
        )?;

        registry.register(Box::new(purchases.clone()))?;
        registry.register(Box::new(async_failures.clone()))?;
        registry.register(Box::new(jobs.clone()))?;
        registry.register(Box::new(pending_jobs.clone()))?;
        registry.register(Box::new(trust_queue.clone()))?;

        Ok(Self { registry, purchases, async_failures, jobs, pending_jobs, trust_queue })
    }

    pub fn purchase<T>(&self, kind: &str, result: &OrderResult<T>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.purchases.with_label_values(&[kind, outcome]).inc();
    }

    pub fn scheduler_run(&self, report: &RunReport) {
        self.jobs.with_label_values(&["completed"]).inc_by(report.completed as u64);
        self.jobs.with_label_values(&["retried"]).inc_by(report.retried as u64);
        if report.dropped > 0 {
            self.jobs.with_label_values(&["dropped"]).inc_by(report.dropped as u64);
            self.async_failures.with_label_values(&["fulfillment"]).inc_by(report.dropped as u64);
        }
    }

    pub fn async_failure(&self, task: &str) {
        self.async_failures.with_label_values(&[task]).inc();
    }

    pub fn pending_jobs(&self, count: u64) {
        self.pending_jobs.set(count as i64);
    }

    /// Folds the trust worker's counters in. Failures only ever grow.
    pub fn trust_snapshot(&self, snapshot: TrustStatsSnapshot) {
        self.trust_queue.with_label_values(&["published"]).set(snapshot.published as i64);
        self.trust_queue.with_label_values(&["dropped"]).set(snapshot.dropped as i64);
        self.trust_queue.with_label_values(&["processed"]).set(snapshot.processed as i64);

        let failures = self.async_failures.with_label_values(&["trust"]);
        let seen = failures.get();
        if snapshot.failed > seen {
            failures.inc_by(snapshot.failed - seen);
        }
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.telemetry.trust_snapshot(state.trust_stats.snapshot());
    match state.orders.repos().jobs.pending_count().await {
        Ok(count) => state.telemetry.pending_jobs(count),
        Err(e) => tracing::warn!(error = %e, "pending job count unavailable"),
    }

    match state.telemetry.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
