use async_trait::async_trait;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::models::*;
use crate::CoreResult;

/// Repository trait for order records
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &Order) -> CoreResult<()>;

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>>;

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>>;

    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>>;

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>>;

    /// Moves the order to `to` only if it is currently `from`. Returns whether the write happened.
    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> CoreResult<bool>;

    async fn delete_order(&self, id: Uuid) -> CoreResult<()>;
}

/// Repository trait for payment records
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()>;

    async fn delete_payment(&self, id: Uuid) -> CoreResult<()>;

    /// Payments where the user is payer or payee, optionally filtered by type.
    async fn list_by_user(&self, user_id: Uuid, payment_type: Option<PaymentType>) -> CoreResult<Vec<Payment>>;

    async fn total_platform_fees(&self) -> CoreResult<i64>;

    async fn total_sales(&self) -> CoreResult<i64>;
}

/// Repository trait for supplier bundles
#[async_trait]
pub trait BundleRepository: Send + Sync {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>>;

    async fn list_available(&self) -> CoreResult<Vec<Bundle>>;

    /// Whether the bundle shows up in the live availability listing.
    async fn is_available(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.list_available().await?.iter().any(|b| b.id == id))
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>>;

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>>;

    /// Conditional: only an Available bundle can be marked purchased.
    async fn mark_purchased(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool>;

    /// Conditional: only succeeds while the bundle is still purchased by `reseller_id`.
    async fn release(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool>;

    /// Decrements the remaining item count. Returns false when already at zero.
    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool>;

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()>;

    async fn count_bundles(&self) -> CoreResult<u64>;
}

/// Repository trait for retail products
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: &Product) -> CoreResult<()>;

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>>;

    async fn update_product(&self, product: &Product) -> CoreResult<()>;

    /// Conditional: Available -> Sold.
    async fn mark_sold(&self, id: Uuid) -> CoreResult<bool>;

    /// Conditional: Sold -> Available.
    async fn mark_available(&self, id: Uuid) -> CoreResult<bool>;

    async fn delete_product(&self, id: Uuid) -> CoreResult<()>;

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>>;

    async fn list_sold_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>>;
}

/// Repository trait for warehouse custody records
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()>;

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>>;

    async fn remove_item(&self, id: Uuid) -> CoreResult<()>;

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>>;

    async fn get_by_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<Option<WarehouseItem>>;

    /// Conditional: Pending -> Listed.
    async fn mark_listed(&self, id: Uuid) -> CoreResult<bool>;

    /// Conditional: Pending -> Skipped.
    async fn mark_skipped(&self, id: Uuid) -> CoreResult<bool>;

    /// Never goes below zero; returns false when nothing was left.
    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool>;

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()>;

    async fn count_skipped(&self) -> CoreResult<u64>;
}

/// Repository trait for accounts and their trust state
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn update_trust_data(&self, id: Uuid, trust: &TrustProfile) -> CoreResult<()>;

    async fn count_users(&self) -> CoreResult<u64>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn add_item(&self, item: &CartItem) -> CoreResult<()>;

    async fn list_items(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>>;

    async fn remove_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool>;

    async fn clear(&self, user_id: Uuid) -> CoreResult<()>;
}

/// Repository trait for review ratings
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Conditional insert: `false` when the reviewer already rated this product.
    async fn record_rating(&self, rating: &ReviewRating) -> CoreResult<bool>;

    async fn has_rated(&self, reviewer_id: Uuid, product_id: Uuid) -> CoreResult<bool>;
}

/// Durable store for delayed transitions. One job per (kind, subject).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts or replaces the job with the same key.
    async fn schedule(&self, job: &ScheduledJob) -> CoreResult<()>;

    /// Jobs whose due time is at or before `now`, earliest first.
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> CoreResult<Vec<ScheduledJob>>;

    async fn complete(&self, kind: JobKind, subject_id: Uuid) -> CoreResult<()>;

    async fn pending_count(&self) -> CoreResult<u64>;
}
