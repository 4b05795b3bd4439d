use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bale_core::repository::{OrderRepository, PaymentRepository};
use bale_core::*;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, bundle_id, supplier_id, product_ids, consumer_id, reseller_id, \
     total_price_cents, platform_fee_cents, status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    bundle_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
    product_ids: Option<Vec<Uuid>>,
    consumer_id: Option<Uuid>,
    reseller_id: Uuid,
    total_price_cents: i64,
    platform_fee_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> CoreResult<Order> {
        let subject = match (self.bundle_id, self.supplier_id, self.product_ids, self.consumer_id) {
            (Some(bundle_id), Some(supplier_id), None, None) => OrderSubject::Bundle { bundle_id, supplier_id },
            (None, None, Some(product_ids), Some(consumer_id)) if !product_ids.is_empty() => {
                OrderSubject::Products { product_ids, consumer_id }
            }
            _ => {
                return Err(CoreError::RepositoryError(format!(
                    "order {} has neither a bundle nor products",
                    self.id
                )))
            }
        };

        Ok(Order {
            id: self.id,
            subject,
            reseller_id: self.reseller_id,
            total_price_cents: self.total_price_cents,
            platform_fee_cents: self.platform_fee_cents,
            status: self.status.parse()?,
            created_at: self.created_at,
        })
    }
}

impl StoreOrderRepository {
    async fn list_where(&self, column: &str, value: Uuid) -> CoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE {} = $1 ORDER BY created_at",
            ORDER_COLUMNS, column
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &Order) -> CoreResult<()> {
        let product_ids = match &order.subject {
            OrderSubject::Products { product_ids, .. } => Some(product_ids.clone()),
            OrderSubject::Bundle { .. } => None,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (id, bundle_id, supplier_id, product_ids, consumer_id, reseller_id,
                                total_price_cents, platform_fee_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.bundle_id())
        .bind(order.supplier_id())
        .bind(product_ids)
        .bind(order.consumer_id())
        .bind(order.reseller_id)
        .bind(order.total_price_cents)
        .bind(order.platform_fee_cents)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>> {
        self.list_where("reseller_id", reseller_id).await
    }

    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>> {
        self.list_where("consumer_id", consumer_id).await
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>> {
        self.list_where("supplier_id", supplier_id).await
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_order(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }
}

// ============================================================================
// Payments
// ============================================================================

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    amount_cents: i64,
    platform_fee_cents: i64,
    seller_earning_cents: i64,
    status: String,
    reference_id: Uuid,
    payment_type: String,
    charge_reference: String,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> CoreResult<Payment> {
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            from_user_id: self.from_user_id,
            to_user_id: self.to_user_id,
            amount_cents: self.amount_cents,
            platform_fee_cents: self.platform_fee_cents,
            seller_earning_cents: self.seller_earning_cents,
            status: self.status.parse()?,
            reference_id: self.reference_id,
            payment_type: self.payment_type.parse()?,
            charge_reference: self.charge_reference,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, from_user_id, to_user_id, amount_cents, platform_fee_cents,
                                  seller_earning_cents, status, reference_id, payment_type, charge_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(payment.from_user_id)
        .bind(payment.to_user_id)
        .bind(payment.amount_cents)
        .bind(payment.platform_fee_cents)
        .bind(payment.seller_earning_cents)
        .bind(payment.status.as_str())
        .bind(payment.reference_id)
        .bind(payment.payment_type.as_str())
        .bind(&payment.charge_reference)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn delete_payment(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid, payment_type: Option<PaymentType>) -> CoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, order_id, from_user_id, to_user_id, amount_cents, platform_fee_cents,
                   seller_earning_cents, status, reference_id, payment_type, charge_reference, created_at
            FROM payments
            WHERE (from_user_id = $1 OR to_user_id = $1)
              AND ($2::TEXT IS NULL OR payment_type = $2)
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(payment_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn total_platform_fees(&self) -> CoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(platform_fee_cents), 0)::BIGINT FROM payments")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)
    }

    async fn total_sales(&self) -> CoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)
    }
}
