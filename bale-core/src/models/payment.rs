use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Reseller pays supplier for a bundle
    B2b,
    /// Consumer pays reseller for a product
    B2c,
}

wire_enum!(PaymentType {
    B2b => "B2B",
    B2c => "B2C",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
}

wire_enum!(PaymentStatus {
    Paid => "PAID",
});

/// Split of a gross amount between the platform and the seller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub gross_cents: i64,
    pub platform_fee_cents: i64,
    pub net_cents: i64,
}

impl FeeBreakdown {
    pub fn is_balanced(&self) -> bool {
        self.platform_fee_cents + self.net_cents == self.gross_cents
    }
}

/// Money movement for exactly one order. Never mutated once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub seller_earning_cents: i64,
    pub status: PaymentStatus,
    /// Bundle or product the money paid for
    pub reference_id: Uuid,
    pub payment_type: PaymentType,
    /// Gateway charge this record settles
    pub charge_reference: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        order_id: Uuid,
        from_user_id: Uuid,
        to_user_id: Uuid,
        reference_id: Uuid,
        payment_type: PaymentType,
        fees: &FeeBreakdown,
        charge_reference: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            from_user_id,
            to_user_id,
            amount_cents: fees.gross_cents,
            platform_fee_cents: fees.platform_fee_cents,
            seller_earning_cents: fees.net_cents,
            status: PaymentStatus::Paid,
            reference_id,
            payment_type,
            charge_reference,
            created_at: Utc::now(),
        }
    }
}
