use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use bale_core::{CartItem, FeeBreakdown, Order, Product};
use bale_shared::money::format_minor;

use crate::error::{ConflictKind, OrderError, OrderResult};
use crate::orchestrator::{OrderOrchestrator, ProductPurchase};
use crate::saga::{Compensation, CompensationLog};

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLine {
    pub listing_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub lines: Vec<CheckoutLine>,
    pub orders: Vec<Order>,
    pub total_cents: i64,
    pub platform_fee_cents: i64,
    pub net_payable_cents: i64,
}

impl CheckoutSummary {
    fn from_lines(lines: Vec<CheckoutLine>, orders: Vec<Order>, fees: FeeBreakdown) -> Self {
        Self {
            lines,
            orders,
            total_cents: fees.gross_cents,
            platform_fee_cents: fees.platform_fee_cents,
            net_payable_cents: fees.net_cents,
        }
    }
}

/// Cart management and multi-line checkout on top of [`OrderOrchestrator::purchase_product`].
///
/// Each line is its own compensated purchase. Lines are NOT atomic with each other: when line k
/// fails, lines before it stay sold and paid and the call still returns the error.
pub struct CheckoutOrchestrator {
    orders: Arc<OrderOrchestrator>,
}

impl CheckoutOrchestrator {
    pub fn new(orders: Arc<OrderOrchestrator>) -> Self {
        Self { orders }
    }

    pub async fn add_to_cart(&self, user_id: Uuid, listing_id: Uuid) -> OrderResult<CartItem> {
        let repos = self.orders.repos();
        let product = repos
            .products
            .get_product(listing_id)
            .await?
            .ok_or(OrderError::not_found("product", listing_id))?;
        if !product.is_available() {
            return Err(OrderError::Conflict(ConflictKind::AlreadySold));
        }
        if product.reseller_id == user_id {
            return Err(OrderError::Conflict(ConflictKind::SelfPurchase));
        }
        if repos.carts.list_items(user_id).await?.iter().any(|l| l.listing_id == listing_id) {
            return Err(OrderError::Validation("item already in cart".to_string()));
        }

        let item = CartItem::from_product(user_id, &product);
        repos.carts.add_item(&item).await?;
        info!(%user_id, %listing_id, "added to cart");
        Ok(item)
    }

    pub async fn get_cart(&self, user_id: Uuid) -> OrderResult<Vec<CartItem>> {
        Ok(self.orders.repos().carts.list_items(user_id).await?)
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, listing_id: Uuid) -> OrderResult<()> {
        if !self.orders.repos().carts.remove_item(user_id, listing_id).await? {
            return Err(OrderError::not_found("cart item", listing_id));
        }
        Ok(())
    }

    pub async fn checkout_cart(&self, user_id: Uuid) -> OrderResult<CheckoutSummary> {
        let cart = self.orders.repos().carts.list_items(user_id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let summary = self.checkout_lines(user_id, &cart).await?;
        self.orders.repos().carts.clear(user_id).await?;
        info!(%user_id, lines = summary.lines.len(), total = %format_minor(summary.total_cents), "cart checked out");
        Ok(summary)
    }

    /// Express checkout of one cart line. Other lines stay in the cart.
    pub async fn checkout_single_item(&self, user_id: Uuid, listing_id: Uuid) -> OrderResult<CheckoutSummary> {
        let cart = self.orders.repos().carts.list_items(user_id).await?;
        let line = cart
            .into_iter()
            .find(|l| l.listing_id == listing_id)
            .ok_or(OrderError::not_found("cart item", listing_id))?;

        let summary = self.checkout_lines(user_id, std::slice::from_ref(&line)).await?;
        self.orders.repos().carts.remove_item(user_id, listing_id).await?;
        info!(%user_id, %listing_id, total = %format_minor(summary.total_cents), "single item checked out");
        Ok(summary)
    }

    async fn checkout_lines(&self, user_id: Uuid, cart: &[CartItem]) -> OrderResult<CheckoutSummary> {
        let mut lines = Vec::with_capacity(cart.len());
        let mut orders = Vec::with_capacity(cart.len());
        let mut gross = 0_i64;

        for (idx, line) in cart.iter().enumerate() {
            let product = match self.orders.repos().products.get_product(line.listing_id).await? {
                Some(p) if p.is_available() => p,
                _ => {
                    if idx > 0 {
                        warn!(%user_id, committed = idx, listing_id = %line.listing_id, "checkout aborted after partial commit");
                    }
                    return Err(OrderError::ItemUnavailable {
                        listing_id: line.listing_id,
                        title: line.title.clone(),
                    });
                }
            };

            let purchase = self.checkout_line(user_id, &product).await?;
            gross += product.price_cents;
            lines.push(CheckoutLine {
                listing_id: product.id,
                title: product.title.clone(),
                price_cents: product.price_cents,
                order_id: purchase.order.id,
            });
            orders.push(purchase.order);
        }

        let fees = self.orders.payments().compute_fees(gross)?;
        Ok(CheckoutSummary::from_lines(lines, orders, fees))
    }

    /// One line: charge, order, payment, Available -> Sold, delivery job.
    async fn checkout_line(&self, user_id: Uuid, product: &Product) -> OrderResult<ProductPurchase> {
        let mut log = CompensationLog::new();
        let result = async {
            let purchase = self
                .orders
                .product_writes(product, user_id, product.price_cents, &mut log)
                .await?;

            if !self.orders.repos().products.mark_sold(product.id).await? {
                return Err(OrderError::ItemUnavailable {
                    listing_id: product.id,
                    title: product.title.clone(),
                });
            }
            log.record(Compensation::RestoreProduct(product.id));

            self.orders
                .scheduler()
                .schedule_delivery(purchase.order.id, Utc::now())
                .await?;
            Ok::<_, OrderError>(purchase)
        }
        .await;

        if let Err(e) = &result {
            error!(%user_id, listing_id = %product.id, error = %e, "checkout line failed");
        }
        self.orders.finish_product(result, log, product.id, user_id).await
    }
}
