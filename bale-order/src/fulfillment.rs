//! Warehouse item lifecycle and the durable timer that drives it.
//!
//! ```text
//! Pending --(delay elapsed)--> Listed
//! Pending --(manual)---------> Skipped
//! ```
//! Listed and Skipped are terminal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bale_core::repository::{JobStore, OrderRepository, WarehouseRepository};
use bale_core::{JobKind, OrderStatus, ScheduledJob, WarehouseItem, WarehouseStatus};

use crate::error::{OrderError, OrderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(WarehouseStatus),
    /// Item was already terminal; nothing written.
    Unchanged(WarehouseStatus),
}

pub struct FulfillmentStateMachine {
    warehouse: Arc<dyn WarehouseRepository>,
}

impl FulfillmentStateMachine {
    pub fn new(warehouse: Arc<dyn WarehouseRepository>) -> Self {
        Self { warehouse }
    }

    async fn load(&self, item_id: Uuid) -> OrderResult<WarehouseItem> {
        self.warehouse
            .get_item(item_id)
            .await?
            .ok_or(OrderError::not_found("warehouse item", item_id))
    }

    /// Automatic Pending -> Listed. Idempotent: a terminal item is left alone.
    pub async fn list(&self, item_id: Uuid) -> OrderResult<Transition> {
        let item = self.load(item_id).await?;
        if item.status.is_terminal() {
            debug!(%item_id, status = %item.status, "listing skipped, item already terminal");
            return Ok(Transition::Unchanged(item.status));
        }

        if self.warehouse.mark_listed(item_id).await? {
            info!(%item_id, "warehouse item listed");
            return Ok(Transition::Applied(WarehouseStatus::Listed));
        }

        // lost the race to a manual skip
        let current = self.load(item_id).await?;
        debug!(%item_id, status = %current.status, "listing lost race");
        Ok(Transition::Unchanged(current.status))
    }

    /// Manual Pending -> Skipped, only by the reseller holding the item.
    pub async fn skip(&self, item_id: Uuid, reseller_id: Uuid) -> OrderResult<WarehouseItem> {
        let mut item = self.load(item_id).await?;
        if item.reseller_id != reseller_id {
            return Err(OrderError::Forbidden("warehouse item belongs to another reseller".to_string()));
        }
        if item.status.is_terminal() || !self.warehouse.mark_skipped(item_id).await? {
            let current = self.load(item_id).await?;
            return Err(OrderError::InvalidTransition {
                from: current.status.to_string(),
                to: WarehouseStatus::Skipped.to_string(),
            });
        }

        info!(%item_id, %reseller_id, "warehouse item skipped");
        item.status = WarehouseStatus::Skipped;
        Ok(item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerPolicy {
    pub fulfillment_delay: Duration,
    pub delivery_delay: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            fulfillment_delay: Duration::minutes(3),
            delivery_delay: Duration::minutes(3),
            batch_size: 100,
            max_attempts: 5,
            retry_backoff: Duration::seconds(30),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub completed: usize,
    pub retried: usize,
    pub dropped: usize,
}

/// Persists delayed transitions and runs them once due.
pub struct FulfillmentScheduler {
    jobs: Arc<dyn JobStore>,
    orders: Arc<dyn OrderRepository>,
    machine: FulfillmentStateMachine,
    policy: SchedulerPolicy,
}

impl FulfillmentScheduler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        orders: Arc<dyn OrderRepository>,
        warehouse: Arc<dyn WarehouseRepository>,
        policy: SchedulerPolicy,
    ) -> Self {
        Self {
            jobs,
            orders,
            machine: FulfillmentStateMachine::new(warehouse),
            policy,
        }
    }

    pub fn machine(&self) -> &FulfillmentStateMachine {
        &self.machine
    }

    pub fn policy(&self) -> SchedulerPolicy {
        self.policy
    }

    pub async fn schedule_listing(&self, item_id: Uuid, now: DateTime<Utc>) -> OrderResult<ScheduledJob> {
        let job = ScheduledJob::new(JobKind::ListWarehouseItem, item_id, now + self.policy.fulfillment_delay);
        self.jobs.schedule(&job).await?;
        debug!(%item_id, due_at = %job.due_at, "listing scheduled");
        Ok(job)
    }

    pub async fn schedule_delivery(&self, order_id: Uuid, now: DateTime<Utc>) -> OrderResult<ScheduledJob> {
        let job = ScheduledJob::new(JobKind::MarkOrderDelivered, order_id, now + self.policy.delivery_delay);
        self.jobs.schedule(&job).await?;
        debug!(%order_id, due_at = %job.due_at, "delivery scheduled");
        Ok(job)
    }

    /// Executes every job due at `now`, up to one batch.
    pub async fn run_due(&self, now: DateTime<Utc>) -> OrderResult<RunReport> {
        let due = self.jobs.due(now, self.policy.batch_size).await?;
        let mut report = RunReport::default();

        for job in due {
            match self.execute(&job).await {
                Ok(()) => {
                    self.jobs.complete(job.kind, job.subject_id).await?;
                    report.completed += 1;
                }
                Err(e) => {
                    let attempts = job.attempts + 1;
                    if attempts >= self.policy.max_attempts {
                        error!(job = %job.key(), attempts, error = %e, "job exhausted retries, dropping");
                        self.jobs.complete(job.kind, job.subject_id).await?;
                        report.dropped += 1;
                    } else {
                        let retry = ScheduledJob {
                            attempts,
                            due_at: now + self.policy.retry_backoff * attempts as i32,
                            ..job.clone()
                        };
                        warn!(job = %job.key(), attempts, retry_at = %retry.due_at, error = %e, "job failed, will retry");
                        self.jobs.schedule(&retry).await?;
                        report.retried += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn execute(&self, job: &ScheduledJob) -> OrderResult<()> {
        match job.kind {
            JobKind::ListWarehouseItem => match self.machine.list(job.subject_id).await {
                Ok(_) => Ok(()),
                Err(OrderError::NotFound { .. }) => {
                    warn!(item_id = %job.subject_id, "warehouse item vanished before listing");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            JobKind::MarkOrderDelivered => {
                let Some(order) = self.orders.get_order(job.subject_id).await? else {
                    warn!(order_id = %job.subject_id, "order vanished before delivery");
                    return Ok(());
                };
                if !order.status.can_transition_to(OrderStatus::Delivered) {
                    debug!(order_id = %order.id, status = %order.status, "delivery skipped");
                    return Ok(());
                }
                if self
                    .orders
                    .update_status(order.id, OrderStatus::Completed, OrderStatus::Delivered)
                    .await?
                {
                    info!(order_id = %order.id, "order delivered");
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_core::{Bundle, FeeBreakdown, Order};
    use bale_store::memory::{MemoryJobStore, MemoryOrderRepository, MemoryWarehouseRepository};

    struct Fixture {
        jobs: Arc<MemoryJobStore>,
        warehouse: Arc<MemoryWarehouseRepository>,
        orders: Arc<MemoryOrderRepository>,
        scheduler: FulfillmentScheduler,
    }

    fn fixture(policy: SchedulerPolicy) -> Fixture {
        let jobs = Arc::new(MemoryJobStore::default());
        let warehouse = Arc::new(MemoryWarehouseRepository::default());
        let orders = Arc::new(MemoryOrderRepository::default());
        let scheduler = FulfillmentScheduler::new(jobs.clone(), orders.clone(), warehouse.clone(), policy);
        Fixture { jobs, warehouse, orders, scheduler }
    }

    async fn pending_item(repo: &MemoryWarehouseRepository, reseller_id: Uuid) -> WarehouseItem {
        let bundle = Bundle::new(Uuid::new_v4(), "mixed tees", 8_000, 30, 4.0);
        let item = WarehouseItem::from_bundle(&bundle, reseller_id);
        repo.add_item(&item).await.unwrap();
        item
    }

    #[tokio::test]
    async fn test_listing_waits_for_delay() {
        let f = fixture(SchedulerPolicy::default());
        let item = pending_item(&f.warehouse, Uuid::new_v4()).await;
        let t0 = Utc::now();
        f.scheduler.schedule_listing(item.id, t0).await.unwrap();

        let early = f.scheduler.run_due(t0 + Duration::seconds(179)).await.unwrap();
        assert_eq!(early, RunReport::default());
        assert_eq!(f.warehouse.get_item(item.id).await.unwrap().unwrap().status, WarehouseStatus::Pending);

        let report = f.scheduler.run_due(t0 + Duration::seconds(180)).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(f.warehouse.get_item(item.id).await.unwrap().unwrap().status, WarehouseStatus::Listed);
        assert_eq!(f.jobs.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_skip_before_timer_wins() {
        let f = fixture(SchedulerPolicy::default());
        let reseller = Uuid::new_v4();
        let item = pending_item(&f.warehouse, reseller).await;
        let t0 = Utc::now();
        f.scheduler.schedule_listing(item.id, t0).await.unwrap();

        f.scheduler.machine().skip(item.id, reseller).await.unwrap();
        let report = f.scheduler.run_due(t0 + Duration::minutes(5)).await.unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(f.warehouse.get_item(item.id).await.unwrap().unwrap().status, WarehouseStatus::Skipped);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_further_transitions() {
        let f = fixture(SchedulerPolicy::default());
        let reseller = Uuid::new_v4();
        let item = pending_item(&f.warehouse, reseller).await;
        let machine = f.scheduler.machine();

        assert_eq!(machine.list(item.id).await.unwrap(), Transition::Applied(WarehouseStatus::Listed));
        assert_eq!(machine.list(item.id).await.unwrap(), Transition::Unchanged(WarehouseStatus::Listed));

        let err = machine.skip(item.id, reseller).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { ref from, .. } if from == "LISTED"));
        assert_eq!(f.warehouse.get_item(item.id).await.unwrap().unwrap().status, WarehouseStatus::Listed);
    }

    #[tokio::test]
    async fn test_skip_requires_owner() {
        let f = fixture(SchedulerPolicy::default());
        let item = pending_item(&f.warehouse, Uuid::new_v4()).await;
        let err = f.scheduler.machine().skip(item.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_failed_job_retries_then_drops() {
        let policy = SchedulerPolicy { max_attempts: 2, ..SchedulerPolicy::default() };
        let f = fixture(policy);
        let item = pending_item(&f.warehouse, Uuid::new_v4()).await;
        let t0 = Utc::now();
        f.scheduler.schedule_listing(item.id, t0).await.unwrap();
        f.warehouse.faults.arm("mark_listed");

        let first = f.scheduler.run_due(t0 + Duration::minutes(3)).await.unwrap();
        assert_eq!(first.retried, 1);
        let retry = f.jobs.get(JobKind::ListWarehouseItem, item.id).await.unwrap();
        assert_eq!(retry.attempts, 1);
        assert_eq!(retry.due_at, t0 + Duration::minutes(3) + Duration::seconds(30));

        let second = f.scheduler.run_due(retry.due_at).await.unwrap();
        assert_eq!(second.dropped, 1);
        assert_eq!(f.jobs.pending_count().await.unwrap(), 0);
        assert_eq!(f.warehouse.get_item(item.id).await.unwrap().unwrap().status, WarehouseStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_item_completes_job() {
        let f = fixture(SchedulerPolicy::default());
        let t0 = Utc::now();
        f.scheduler.schedule_listing(Uuid::new_v4(), t0).await.unwrap();
        let report = f.scheduler.run_due(t0 + Duration::minutes(3)).await.unwrap();
        assert_eq!(report.completed, 1);
    }

    #[tokio::test]
    async fn test_delivery_only_moves_completed_orders() {
        let f = fixture(SchedulerPolicy::default());
        let fees = FeeBreakdown { gross_cents: 4_000, platform_fee_cents: 80, net_cents: 3_920 };
        let completed = Order::for_product(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &fees);
        let failed = Order::for_product(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &fees);
        f.orders.create_order(&completed).await.unwrap();
        f.orders.create_order(&failed).await.unwrap();
        f.orders.update_status(failed.id, OrderStatus::Completed, OrderStatus::Failed).await.unwrap();

        let t0 = Utc::now();
        f.scheduler.schedule_delivery(completed.id, t0).await.unwrap();
        f.scheduler.schedule_delivery(failed.id, t0).await.unwrap();
        let report = f.scheduler.run_due(t0 + Duration::days(1)).await.unwrap();

        assert_eq!(report.completed, 2);
        assert_eq!(f.orders.get_order(completed.id).await.unwrap().unwrap().status, OrderStatus::Delivered);
        assert_eq!(f.orders.get_order(failed.id).await.unwrap().unwrap().status, OrderStatus::Failed);
    }
}
