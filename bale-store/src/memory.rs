//! In-process repositories for tests and local runs.
//!
//! Every repository carries a [`FailPoints`] handle; arming an operation name makes the
//! next calls to it fail with a repository error until disarmed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use bale_core::repository::*;
use bale_core::*;

#[derive(Clone, Default)]
pub struct FailPoints {
    armed: Arc<Mutex<HashSet<String>>>,
}

impl FailPoints {
    pub fn arm(&self, op: &str) {
        self.armed.lock().unwrap_or_else(|e| e.into_inner()).insert(op.to_string());
    }

    pub fn disarm(&self, op: &str) {
        self.armed.lock().unwrap_or_else(|e| e.into_inner()).remove(op);
    }

    fn check(&self, op: &str) -> CoreResult<()> {
        if self.armed.lock().unwrap_or_else(|e| e.into_inner()).contains(op) {
            return Err(CoreError::RepositoryError(format!("injected failure: {}", op)));
        }
        Ok(())
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
    pub faults: FailPoints,
}

impl MemoryOrderRepository {
    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }

    async fn filtered(&self, pred: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut out: Vec<Order> = self.orders.read().await.values().filter(|o| pred(o)).cloned().collect();
        out.sort_by_key(|o| o.created_at);
        out
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, order: &Order) -> CoreResult<()> {
        self.faults.check("create_order")?;
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        self.faults.check("get_order")?;
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>> {
        self.faults.check("list_orders")?;
        Ok(self.filtered(|o| o.reseller_id == reseller_id).await)
    }

    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>> {
        self.faults.check("list_orders")?;
        Ok(self.filtered(|o| o.consumer_id() == Some(consumer_id)).await)
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>> {
        self.faults.check("list_orders")?;
        Ok(self.filtered(|o| o.supplier_id() == Some(supplier_id)).await)
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> CoreResult<bool> {
        self.faults.check("update_status")?;
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_order(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("delete_order")?;
        self.orders.write().await.remove(&id);
        Ok(())
    }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Default)]
pub struct MemoryPaymentRepository {
    payments: RwLock<HashMap<Uuid, Payment>>,
    pub faults: FailPoints,
}

impl MemoryPaymentRepository {
    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl PaymentRepository for MemoryPaymentRepository {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()> {
        self.faults.check("record_payment")?;
        self.payments.write().await.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn delete_payment(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("delete_payment")?;
        self.payments.write().await.remove(&id);
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid, payment_type: Option<PaymentType>) -> CoreResult<Vec<Payment>> {
        self.faults.check("list_payments")?;
        let mut out: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.from_user_id == user_id || p.to_user_id == user_id)
            .filter(|p| payment_type.map_or(true, |t| p.payment_type == t))
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }

    async fn total_platform_fees(&self) -> CoreResult<i64> {
        self.faults.check("total_platform_fees")?;
        Ok(self.payments.read().await.values().map(|p| p.platform_fee_cents).sum())
    }

    async fn total_sales(&self) -> CoreResult<i64> {
        self.faults.check("total_sales")?;
        Ok(self.payments.read().await.values().map(|p| p.amount_cents).sum())
    }
}

// ============================================================================
// Bundles
// ============================================================================

/// Keeps the availability listing as its own index so a status flag and the listing
/// can be observed disagreeing.
#[derive(Default)]
pub struct MemoryBundleRepository {
    bundles: RwLock<HashMap<Uuid, Bundle>>,
    listing: RwLock<HashSet<Uuid>>,
    pub faults: FailPoints,
}

impl MemoryBundleRepository {
    pub async fn insert_bundle(&self, bundle: &Bundle) {
        if bundle.status == BundleStatus::Available {
            self.listing.write().await.insert(bundle.id);
        }
        self.bundles.write().await.insert(bundle.id, bundle.clone());
    }

    /// Drops the bundle from the listing without touching its status.
    pub async fn delist(&self, id: Uuid) {
        self.listing.write().await.remove(&id);
    }

    pub async fn remove_bundle(&self, id: Uuid) {
        self.listing.write().await.remove(&id);
        self.bundles.write().await.remove(&id);
    }
}

#[async_trait]
impl BundleRepository for MemoryBundleRepository {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>> {
        self.faults.check("get_bundle")?;
        Ok(self.bundles.read().await.get(&id).cloned())
    }

    async fn list_available(&self) -> CoreResult<Vec<Bundle>> {
        self.faults.check("list_available")?;
        let bundles = self.bundles.read().await;
        let listing = self.listing.read().await;
        Ok(listing.iter().filter_map(|id| bundles.get(id).cloned()).collect())
    }

    async fn is_available(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("list_available")?;
        Ok(self.listing.read().await.contains(&id))
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>> {
        self.faults.check("list_bundles")?;
        Ok(self.bundles.read().await.values().filter(|b| b.supplier_id == supplier_id).cloned().collect())
    }

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>> {
        self.faults.check("list_bundles")?;
        Ok(self
            .bundles
            .read()
            .await
            .values()
            .filter(|b| b.status == BundleStatus::Purchased && b.purchased_by == Some(reseller_id))
            .cloned()
            .collect())
    }

    async fn mark_purchased(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool> {
        self.faults.check("mark_purchased")?;
        let mut bundles = self.bundles.write().await;
        match bundles.get_mut(&id) {
            Some(bundle) if bundle.status == BundleStatus::Available => {
                bundle.status = BundleStatus::Purchased;
                bundle.purchased_by = Some(reseller_id);
                self.listing.write().await.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool> {
        self.faults.check("release")?;
        let mut bundles = self.bundles.write().await;
        match bundles.get_mut(&id) {
            Some(bundle) if bundle.status == BundleStatus::Purchased && bundle.purchased_by == Some(reseller_id) => {
                bundle.status = BundleStatus::Available;
                bundle.purchased_by = None;
                self.listing.write().await.insert(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("decrease_bundle_remaining")?;
        let mut bundles = self.bundles.write().await;
        match bundles.get_mut(&id) {
            Some(bundle) if bundle.remaining_item_count > 0 => {
                bundle.remaining_item_count -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("restore_bundle_remaining")?;
        if let Some(bundle) = self.bundles.write().await.get_mut(&id) {
            bundle.remaining_item_count += 1;
        }
        Ok(())
    }

    async fn count_bundles(&self) -> CoreResult<u64> {
        self.faults.check("count_bundles")?;
        Ok(self.bundles.read().await.len() as u64)
    }
}

// ============================================================================
// Products
// ============================================================================

#[derive(Default)]
pub struct MemoryProductRepository {
    products: RwLock<HashMap<Uuid, Product>>,
    pub faults: FailPoints,
}

impl MemoryProductRepository {
    /// Flips the status behind every caller's back.
    pub async fn force_status(&self, id: Uuid, status: ProductStatus) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.status = status;
        }
    }

    async fn set_status(&self, id: Uuid, from: ProductStatus, to: ProductStatus) -> bool {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(product) if product.status == from => {
                product.status = to;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn create_product(&self, product: &Product) -> CoreResult<()> {
        self.faults.check("create_product")?;
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>> {
        self.faults.check("get_product")?;
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn update_product(&self, product: &Product) -> CoreResult<()> {
        self.faults.check("update_product")?;
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(CoreError::RepositoryError(format!("product {} does not exist", product.id))),
        }
    }

    async fn mark_sold(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("mark_sold")?;
        Ok(self.set_status(id, ProductStatus::Available, ProductStatus::Sold).await)
    }

    async fn mark_available(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("mark_available")?;
        Ok(self.set_status(id, ProductStatus::Sold, ProductStatus::Available).await)
    }

    async fn delete_product(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("delete_product")?;
        self.products.write().await.remove(&id);
        Ok(())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>> {
        self.faults.check("list_products")?;
        Ok(self.products.read().await.values().filter(|p| p.reseller_id == reseller_id).cloned().collect())
    }

    async fn list_sold_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>> {
        self.faults.check("list_products")?;
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.reseller_id == reseller_id && p.status == ProductStatus::Sold)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Warehouse
// ============================================================================

#[derive(Default)]
pub struct MemoryWarehouseRepository {
    items: RwLock<HashMap<Uuid, WarehouseItem>>,
    pub faults: FailPoints,
}

impl MemoryWarehouseRepository {
    pub async fn all(&self) -> Vec<WarehouseItem> {
        self.items.read().await.values().cloned().collect()
    }

    async fn transition(&self, id: Uuid, to: WarehouseStatus) -> bool {
        let mut items = self.items.write().await;
        match items.get_mut(&id) {
            Some(item) if item.status == WarehouseStatus::Pending => {
                item.status = to;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl WarehouseRepository for MemoryWarehouseRepository {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()> {
        self.faults.check("add_item")?;
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        self.faults.check("get_item")?;
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn remove_item(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("remove_item")?;
        self.items.write().await.remove(&id);
        Ok(())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        self.faults.check("list_items")?;
        let mut out: Vec<WarehouseItem> =
            self.items.read().await.values().filter(|i| i.reseller_id == reseller_id).cloned().collect();
        out.sort_by_key(|i| i.created_at);
        Ok(out)
    }

    async fn get_by_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        self.faults.check("get_by_bundle")?;
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|i| i.reseller_id == reseller_id && i.bundle_id == bundle_id)
            .cloned())
    }

    async fn mark_listed(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("mark_listed")?;
        Ok(self.transition(id, WarehouseStatus::Listed).await)
    }

    async fn mark_skipped(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("mark_skipped")?;
        Ok(self.transition(id, WarehouseStatus::Skipped).await)
    }

    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool> {
        self.faults.check("decrease_item_remaining")?;
        let mut items = self.items.write().await;
        match items.get_mut(&id) {
            Some(item) if item.remaining_item_count > 0 => {
                item.remaining_item_count -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()> {
        self.faults.check("restore_item_remaining")?;
        if let Some(item) = self.items.write().await.get_mut(&id) {
            item.remaining_item_count += 1;
        }
        Ok(())
    }

    async fn count_skipped(&self) -> CoreResult<u64> {
        self.faults.check("count_skipped")?;
        Ok(self.items.read().await.values().filter(|i| i.status == WarehouseStatus::Skipped).count() as u64)
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
    pub faults: FailPoints,
}

impl MemoryUserRepository {
    pub async fn remove_user(&self, id: Uuid) {
        self.users.write().await.remove(&id);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        self.faults.check("create_user")?;
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        self.faults.check("get_user")?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_trust_data(&self, id: Uuid, trust: &TrustProfile) -> CoreResult<()> {
        self.faults.check("update_trust_data")?;
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| CoreError::RepositoryError(format!("user {} does not exist", id)))?;
        user.trust = *trust;
        Ok(())
    }

    async fn count_users(&self) -> CoreResult<u64> {
        self.faults.check("count_users")?;
        Ok(self.users.read().await.len() as u64)
    }
}

// ============================================================================
// Cart
// ============================================================================

#[derive(Default)]
pub struct MemoryCartRepository {
    lines: RwLock<HashMap<Uuid, Vec<CartItem>>>,
    pub faults: FailPoints,
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn add_item(&self, item: &CartItem) -> CoreResult<()> {
        self.faults.check("add_cart_item")?;
        self.lines.write().await.entry(item.user_id).or_default().push(item.clone());
        Ok(())
    }

    async fn list_items(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>> {
        self.faults.check("list_cart")?;
        Ok(self.lines.read().await.get(&user_id).cloned().unwrap_or_default())
    }

    async fn remove_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool> {
        self.faults.check("remove_cart_item")?;
        let mut lines = self.lines.write().await;
        let Some(cart) = lines.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = cart.len();
        cart.retain(|line| line.listing_id != listing_id);
        Ok(cart.len() != before)
    }

    async fn clear(&self, user_id: Uuid) -> CoreResult<()> {
        self.faults.check("clear_cart")?;
        self.lines.write().await.remove(&user_id);
        Ok(())
    }
}

// ============================================================================
// Review ratings
// ============================================================================

#[derive(Default)]
pub struct MemoryRatingRepository {
    ratings: RwLock<HashMap<(Uuid, Uuid), ReviewRating>>,
    pub faults: FailPoints,
}

#[async_trait]
impl RatingRepository for MemoryRatingRepository {
    async fn record_rating(&self, rating: &ReviewRating) -> CoreResult<bool> {
        self.faults.check("record_rating")?;
        let mut ratings = self.ratings.write().await;
        let key = (rating.reviewer_id, rating.product_id);
        if ratings.contains_key(&key) {
            return Ok(false);
        }
        ratings.insert(key, rating.clone());
        Ok(true)
    }

    async fn has_rated(&self, reviewer_id: Uuid, product_id: Uuid) -> CoreResult<bool> {
        self.faults.check("has_rated")?;
        Ok(self.ratings.read().await.contains_key(&(reviewer_id, product_id)))
    }
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, ScheduledJob>>,
    pub faults: FailPoints,
}

impl MemoryJobStore {
    pub async fn get(&self, kind: JobKind, subject_id: Uuid) -> Option<ScheduledJob> {
        self.jobs.read().await.get(&ScheduledJob::key_for(kind, subject_id)).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn schedule(&self, job: &ScheduledJob) -> CoreResult<()> {
        self.faults.check("schedule")?;
        self.jobs.write().await.insert(job.key(), job.clone());
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> CoreResult<Vec<ScheduledJob>> {
        self.faults.check("due")?;
        let mut due: Vec<ScheduledJob> = self.jobs.read().await.values().filter(|j| j.due_at <= now).cloned().collect();
        due.sort_by_key(|j| j.due_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn complete(&self, kind: JobKind, subject_id: Uuid) -> CoreResult<()> {
        self.faults.check("complete")?;
        self.jobs.write().await.remove(&ScheduledJob::key_for(kind, subject_id));
        Ok(())
    }

    async fn pending_count(&self) -> CoreResult<u64> {
        self.faults.check("pending_count")?;
        Ok(self.jobs.read().await.len() as u64)
    }
}

/// All in-memory repositories, shared through `Arc`s.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub orders: Arc<MemoryOrderRepository>,
    pub payments: Arc<MemoryPaymentRepository>,
    pub bundles: Arc<MemoryBundleRepository>,
    pub products: Arc<MemoryProductRepository>,
    pub warehouse: Arc<MemoryWarehouseRepository>,
    pub users: Arc<MemoryUserRepository>,
    pub carts: Arc<MemoryCartRepository>,
    pub ratings: Arc<MemoryRatingRepository>,
    pub jobs: Arc<MemoryJobStore>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
