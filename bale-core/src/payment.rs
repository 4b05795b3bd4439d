use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::CoreResult;

/// Proof that money moved at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChargeReceipt {
    /// Provider's charge id (e.g. ch_1001)
    pub reference: String,
    pub amount_cents: i64,
    pub charged_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount_cents` against the payer for the given order.
    async fn charge(&self, order_id: Uuid, amount_cents: i64) -> CoreResult<ChargeReceipt>;

    /// Reverse a previous charge.
    async fn refund(&self, charge_reference: &str) -> CoreResult<()>;
}
