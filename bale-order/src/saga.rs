//! Per-purchase undo log.
//!
//! Each committed write pushes the action that reverses it. When a later step fails the log is
//! unwound newest-first. A failing compensation is logged and the unwind continues; the caller
//! still gets the error that started the unwind.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use bale_core::repository::*;

use crate::payment::PaymentComputer;

/// Every store the orchestrators write to.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub bundles: Arc<dyn BundleRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub warehouse: Arc<dyn WarehouseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub ratings: Arc<dyn RatingRepository>,
    pub jobs: Arc<dyn JobStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    RefundCharge(String),
    DeleteOrder(Uuid),
    RemovePayment(Uuid),
    ReleaseBundle { bundle_id: Uuid, reseller_id: Uuid },
    RestoreProduct(Uuid),
    RemoveWarehouseItem(Uuid),
    RestoreBundleCount(Uuid),
    RestoreItemCount(Uuid),
}

#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Reverses every recorded step. Returns how many compensations failed.
    pub async fn unwind(self, repos: &Repositories, payments: &PaymentComputer) -> usize {
        let mut failed = 0;
        for step in self.steps.into_iter().rev() {
            match apply(&step, repos, payments).await {
                Ok(()) => info!(?step, "compensated"),
                Err(e) => {
                    failed += 1;
                    error!(?step, error = %e, "compensation failed");
                }
            }
        }
        failed
    }
}

async fn apply(step: &Compensation, repos: &Repositories, payments: &PaymentComputer) -> Result<(), String> {
    match step {
        Compensation::RefundCharge(reference) => payments.refund(reference).await.map_err(|e| e.to_string()),
        Compensation::DeleteOrder(id) => repos.orders.delete_order(*id).await.map_err(|e| e.to_string()),
        Compensation::RemovePayment(id) => repos.payments.delete_payment(*id).await.map_err(|e| e.to_string()),
        Compensation::ReleaseBundle { bundle_id, reseller_id } => {
            match repos.bundles.release(*bundle_id, *reseller_id).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(format!("bundle {} no longer held by {}", bundle_id, reseller_id)),
                Err(e) => Err(e.to_string()),
            }
        }
        Compensation::RestoreProduct(id) => match repos.products.mark_available(*id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("product {} was not sold", id)),
            Err(e) => Err(e.to_string()),
        },
        Compensation::RemoveWarehouseItem(id) => repos.warehouse.remove_item(*id).await.map_err(|e| e.to_string()),
        Compensation::RestoreBundleCount(id) => repos.bundles.restore_remaining(*id).await.map_err(|e| e.to_string()),
        Compensation::RestoreItemCount(id) => repos.warehouse.restore_remaining(*id).await.map_err(|e| e.to_string()),
    }
}
