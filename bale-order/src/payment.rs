//! Fee arithmetic and the gateway call that gates every purchase.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use bale_core::payment::{ChargeReceipt, PaymentGateway};
use bale_core::{CoreError, CoreResult, FeeBreakdown};
use bale_shared::money::apply_bps;

use crate::error::{OrderError, OrderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub platform_fee_bps: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        // 2%
        Self { platform_fee_bps: 200 }
    }
}

/// `fee = round(gross * bps / 10_000)`, `net = gross - fee`.
pub fn compute_fees(schedule: &FeeSchedule, gross_cents: i64) -> OrderResult<FeeBreakdown> {
    if gross_cents < 0 {
        return Err(OrderError::Validation(format!("negative amount: {}", gross_cents)));
    }
    let platform_fee_cents = apply_bps(gross_cents, schedule.platform_fee_bps);
    Ok(FeeBreakdown {
        gross_cents,
        platform_fee_cents,
        net_cents: gross_cents - platform_fee_cents,
    })
}

pub struct PaymentComputer {
    gateway: Arc<dyn PaymentGateway>,
    schedule: FeeSchedule,
}

impl PaymentComputer {
    pub fn new(gateway: Arc<dyn PaymentGateway>, schedule: FeeSchedule) -> Self {
        Self { gateway, schedule }
    }

    pub fn schedule(&self) -> FeeSchedule {
        self.schedule
    }

    pub fn compute_fees(&self, gross_cents: i64) -> OrderResult<FeeBreakdown> {
        compute_fees(&self.schedule, gross_cents)
    }

    /// Not retried. Any gateway error becomes `PaymentFailed`.
    pub async fn process_external_payment(&self, order_id: Uuid, gross_cents: i64) -> OrderResult<ChargeReceipt> {
        match self.gateway.charge(order_id, gross_cents).await {
            Ok(receipt) => {
                info!(%order_id, charge = %receipt.reference, amount = gross_cents, "payment captured");
                Ok(receipt)
            }
            Err(e) => {
                warn!(%order_id, amount = gross_cents, error = %e, "payment declined");
                Err(OrderError::PaymentFailed(e.to_string()))
            }
        }
    }

    pub async fn refund(&self, charge_reference: &str) -> OrderResult<()> {
        self.gateway
            .refund(charge_reference)
            .await
            .map_err(|e| OrderError::PaymentFailed(e.to_string()))
    }
}

/// Stand-in for a card processor. Always approves, hands out `ch_<n>` references.
pub struct SimulatedGateway {
    next_charge: AtomicU64,
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new(latency: Duration) -> Self {
        Self { next_charge: AtomicU64::new(1000), latency }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, _order_id: Uuid, amount_cents: i64) -> CoreResult<ChargeReceipt> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let n = self.next_charge.fetch_add(1, Ordering::Relaxed);
        Ok(ChargeReceipt {
            reference: format!("ch_{}", n),
            amount_cents,
            charged_at: Utc::now(),
        })
    }

    async fn refund(&self, charge_reference: &str) -> CoreResult<()> {
        info!(charge = %charge_reference, "simulated refund");
        Ok(())
    }
}

/// Gateway whose next outcomes are queued up front. Approves once the queue is empty.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Option<String>>>,
    charges: Mutex<Vec<ChargeReceipt>>,
    refunds: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn decline_next(&self, reason: &str) {
        self.lock_script().push_back(Some(reason.to_string()));
    }

    pub fn approve_next(&self) {
        self.lock_script().push_back(None);
    }

    pub fn charges(&self) -> Vec<ChargeReceipt> {
        self.charges.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn refunds(&self) -> Vec<String> {
        self.refunds.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Option<String>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(&self, _order_id: Uuid, amount_cents: i64) -> CoreResult<ChargeReceipt> {
        if let Some(Some(reason)) = self.lock_script().pop_front() {
            return Err(CoreError::GatewayError(reason));
        }
        let mut charges = self.charges.lock().unwrap_or_else(|e| e.into_inner());
        let receipt = ChargeReceipt {
            reference: format!("ch_test_{}", charges.len() + 1),
            amount_cents,
            charged_at: Utc::now(),
        };
        charges.push(receipt.clone());
        Ok(receipt)
    }

    async fn refund(&self, charge_reference: &str) -> CoreResult<()> {
        self.refunds.lock().unwrap_or_else(|e| e.into_inner()).push(charge_reference.to_string());
        Ok(())
    }
}
