use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::payment::FeeBreakdown;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Delivered,
}

wire_enum!(OrderStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Delivered => "DELIVERED",
});

impl OrderStatus {
    /// Transitions only ever move forward; nothing returns to Pending.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Completed, OrderStatus::Delivered)
        )
    }
}

/// What an order bought. A bundle order never carries products and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSubject {
    Bundle { bundle_id: Uuid, supplier_id: Uuid },
    Products { product_ids: Vec<Uuid>, consumer_id: Uuid },
}

/// A completed marketplace transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub subject: OrderSubject,
    pub reseller_id: Uuid,
    pub total_price_cents: i64,
    pub platform_fee_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// B2B: a reseller buys a supplier's bundle.
    pub fn for_bundle(bundle_id: Uuid, supplier_id: Uuid, reseller_id: Uuid, fees: &FeeBreakdown) -> Self {
        Self::new(OrderSubject::Bundle { bundle_id, supplier_id }, reseller_id, fees)
    }

    /// B2C: a consumer buys one of a reseller's products.
    pub fn for_product(product_id: Uuid, reseller_id: Uuid, consumer_id: Uuid, fees: &FeeBreakdown) -> Self {
        Self::new(
            OrderSubject::Products { product_ids: vec![product_id], consumer_id },
            reseller_id,
            fees,
        )
    }

    fn new(subject: OrderSubject, reseller_id: Uuid, fees: &FeeBreakdown) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            reseller_id,
            total_price_cents: fees.gross_cents,
            platform_fee_cents: fees.platform_fee_cents,
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        }
    }

    pub fn bundle_id(&self) -> Option<Uuid> {
        match &self.subject {
            OrderSubject::Bundle { bundle_id, .. } => Some(*bundle_id),
            OrderSubject::Products { .. } => None,
        }
    }

    pub fn product_ids(&self) -> &[Uuid] {
        match &self.subject {
            OrderSubject::Products { product_ids, .. } => product_ids,
            OrderSubject::Bundle { .. } => &[],
        }
    }

    pub fn supplier_id(&self) -> Option<Uuid> {
        match &self.subject {
            OrderSubject::Bundle { supplier_id, .. } => Some(*supplier_id),
            OrderSubject::Products { .. } => None,
        }
    }

    pub fn consumer_id(&self) -> Option<Uuid> {
        match &self.subject {
            OrderSubject::Products { consumer_id, .. } => Some(*consumer_id),
            OrderSubject::Bundle { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Completed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Failed.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_subject_is_exclusive() {
        let fees = FeeBreakdown { gross_cents: 10_000, platform_fee_cents: 200, net_cents: 9_800 };
        let bundle_order = Order::for_bundle(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &fees);
        assert!(bundle_order.bundle_id().is_some());
        assert!(bundle_order.product_ids().is_empty());
        assert!(bundle_order.consumer_id().is_none());

        let product_order = Order::for_product(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &fees);
        assert!(product_order.bundle_id().is_none());
        assert_eq!(product_order.product_ids().len(), 1);
        assert_eq!(product_order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!("DELIVERED".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_value(OrderStatus::Completed).unwrap(), "COMPLETED");
    }
}
