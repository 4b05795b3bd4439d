use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use bale_core::*;

use crate::error::{ConflictKind, OrderError, OrderResult};
use crate::fulfillment::FulfillmentScheduler;
use crate::payment::PaymentComputer;
use crate::saga::{Compensation, CompensationLog, Repositories};

#[derive(Debug, Clone, Serialize)]
pub struct BundlePurchase {
    pub order: Order,
    pub payment: Payment,
    pub warehouse_item: WarehouseItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPurchase {
    pub order: Order,
    pub payment: Payment,
}

/// Coordinates the writes of one purchase across the independent stores.
pub struct OrderOrchestrator {
    repos: Repositories,
    payments: Arc<PaymentComputer>,
    scheduler: Arc<FulfillmentScheduler>,
}

impl OrderOrchestrator {
    pub fn new(repos: Repositories, payments: Arc<PaymentComputer>, scheduler: Arc<FulfillmentScheduler>) -> Self {
        Self { repos, payments, scheduler }
    }

    pub fn repos(&self) -> &Repositories {
        &self.repos
    }

    pub fn payments(&self) -> &PaymentComputer {
        &self.payments
    }

    pub fn scheduler(&self) -> &FulfillmentScheduler {
        &self.scheduler
    }

    /// B2B purchase. Guards run before the charge; writes run in a fixed order after it:
    /// order, payment, bundle, warehouse item, listing job.
    pub async fn purchase_bundle(&self, bundle_id: Uuid, reseller_id: Uuid) -> OrderResult<BundlePurchase> {
        let bundle = self
            .repos
            .bundles
            .get_bundle(bundle_id)
            .await?
            .ok_or(OrderError::not_found("bundle", bundle_id))?;

        // status alone can be stale; the listing is authoritative
        if bundle.status != BundleStatus::Available || !self.repos.bundles.is_available(bundle_id).await? {
            return Err(OrderError::Conflict(ConflictKind::NotAvailable));
        }

        if bundle.supplier_id == reseller_id {
            return Err(OrderError::Conflict(ConflictKind::SelfPurchase));
        }

        let reseller = self
            .repos
            .users
            .get_user(reseller_id)
            .await?
            .ok_or(OrderError::not_found("user", reseller_id))?;
        if reseller.trust.is_blacklisted {
            warn!(%reseller_id, score = reseller.trust.trust_score, "blacklisted reseller refused");
            return Err(OrderError::Conflict(ConflictKind::Blacklisted));
        }

        let fees = self.payments.compute_fees(bundle.price_cents)?;
        let order = Order::for_bundle(bundle.id, bundle.supplier_id, reseller_id, &fees);
        let receipt = self.payments.process_external_payment(order.id, fees.gross_cents).await?;

        let mut log = CompensationLog::new();
        log.record(Compensation::RefundCharge(receipt.reference.clone()));

        match self.bundle_writes(&bundle, order, &fees, receipt.reference, &mut log).await {
            Ok(purchase) => {
                info!(
                    %bundle_id,
                    %reseller_id,
                    order_id = %purchase.order.id,
                    amount = fees.gross_cents,
                    "bundle purchased"
                );
                Ok(purchase)
            }
            Err(e) => {
                error!(%bundle_id, %reseller_id, error = %e, steps = log.len(), "bundle purchase failed, compensating");
                log.unwind(&self.repos, &self.payments).await;
                Err(e)
            }
        }
    }

    async fn bundle_writes(
        &self,
        bundle: &Bundle,
        order: Order,
        fees: &FeeBreakdown,
        charge_reference: String,
        log: &mut CompensationLog,
    ) -> OrderResult<BundlePurchase> {
        let reseller_id = order.reseller_id;

        self.repos.orders.create_order(&order).await?;
        log.record(Compensation::DeleteOrder(order.id));

        let payment = Payment::new(
            order.id,
            reseller_id,
            bundle.supplier_id,
            bundle.id,
            PaymentType::B2b,
            fees,
            charge_reference,
        );
        self.repos.payments.record_payment(&payment).await?;
        log.record(Compensation::RemovePayment(payment.id));

        if !self.repos.bundles.mark_purchased(bundle.id, reseller_id).await? {
            return Err(OrderError::Conflict(ConflictKind::NotAvailable));
        }
        log.record(Compensation::ReleaseBundle { bundle_id: bundle.id, reseller_id });

        let warehouse_item = WarehouseItem::from_bundle(bundle, reseller_id);
        self.repos.warehouse.add_item(&warehouse_item).await?;
        log.record(Compensation::RemoveWarehouseItem(warehouse_item.id));

        self.scheduler.schedule_listing(warehouse_item.id, Utc::now()).await?;

        Ok(BundlePurchase { order, payment, warehouse_item })
    }

    /// B2C purchase of one product at `total_price_cents`. Leaves the product's status alone;
    /// callers that sell the item mark it themselves (see checkout).
    pub async fn purchase_product(
        &self,
        product_id: Uuid,
        consumer_id: Uuid,
        total_price_cents: i64,
    ) -> OrderResult<ProductPurchase> {
        let product = self
            .repos
            .products
            .get_product(product_id)
            .await?
            .ok_or(OrderError::not_found("product", product_id))?;

        let mut log = CompensationLog::new();
        let result = async {
            let purchase = self
                .product_writes(&product, consumer_id, total_price_cents, &mut log)
                .await?;
            self.scheduler.schedule_delivery(purchase.order.id, Utc::now()).await?;
            Ok::<_, OrderError>(purchase)
        }
        .await;

        self.finish_product(result, log, product_id, consumer_id).await
    }

    /// Charge, then order and payment writes for one product. Compensations go into `log`.
    pub(crate) async fn product_writes(
        &self,
        product: &Product,
        consumer_id: Uuid,
        total_price_cents: i64,
        log: &mut CompensationLog,
    ) -> OrderResult<ProductPurchase> {
        let fees = self.payments.compute_fees(total_price_cents)?;
        let order = Order::for_product(product.id, product.reseller_id, consumer_id, &fees);

        let receipt = self.payments.process_external_payment(order.id, fees.gross_cents).await?;
        log.record(Compensation::RefundCharge(receipt.reference.clone()));

        self.repos.orders.create_order(&order).await?;
        log.record(Compensation::DeleteOrder(order.id));

        let payment = Payment::new(
            order.id,
            consumer_id,
            product.reseller_id,
            product.id,
            PaymentType::B2c,
            &fees,
            receipt.reference,
        );
        self.repos.payments.record_payment(&payment).await?;
        log.record(Compensation::RemovePayment(payment.id));

        Ok(ProductPurchase { order, payment })
    }

    pub(crate) async fn finish_product(
        &self,
        result: OrderResult<ProductPurchase>,
        log: CompensationLog,
        product_id: Uuid,
        consumer_id: Uuid,
    ) -> OrderResult<ProductPurchase> {
        match result {
            Ok(purchase) => {
                info!(
                    %product_id,
                    %consumer_id,
                    order_id = %purchase.order.id,
                    amount = purchase.payment.amount_cents,
                    "product purchased"
                );
                Ok(purchase)
            }
            Err(e) => {
                if !log.is_empty() {
                    error!(%product_id, %consumer_id, error = %e, steps = log.len(), "product purchase failed, compensating");
                    log.unwind(&self.repos, &self.payments).await;
                }
                Err(e)
            }
        }
    }
}
