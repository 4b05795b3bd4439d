//! Bundles, products and warehouse custody. Status changes are guarded `UPDATE ... WHERE status = ...`
//! statements; `rows_affected` tells the caller whether it won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bale_core::repository::{BundleRepository, ProductRepository, WarehouseRepository};
use bale_core::*;

fn count_from_db(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

fn count_to_db(v: u32) -> CoreResult<i32> {
    i32::try_from(v).map_err(CoreError::repository)
}

// ============================================================================
// Bundles
// ============================================================================

pub struct StoreBundleRepository {
    pool: PgPool,
}

impl StoreBundleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, filter: &str, value: Option<Uuid>) -> CoreResult<Vec<Bundle>> {
        let sql = format!(
            "SELECT id, supplier_id, title, price_cents, declared_rating, remaining_item_count, grade, \
             bundle_type, quantity, sorting_level, sample_image, status, purchased_by, date_listed \
             FROM bundles WHERE {} ORDER BY date_listed",
            filter
        );
        let mut query = sqlx::query_as::<_, BundleRow>(&sql);
        if let Some(v) = value {
            query = query.bind(v);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(CoreError::repository)?;
        rows.into_iter().map(BundleRow::into_bundle).collect()
    }
}

#[derive(sqlx::FromRow)]
struct BundleRow {
    id: Uuid,
    supplier_id: Uuid,
    title: String,
    price_cents: i64,
    declared_rating: f64,
    remaining_item_count: i32,
    grade: String,
    bundle_type: String,
    quantity: i32,
    sorting_level: String,
    sample_image: String,
    status: String,
    purchased_by: Option<Uuid>,
    date_listed: DateTime<Utc>,
}

impl BundleRow {
    fn into_bundle(self) -> CoreResult<Bundle> {
        Ok(Bundle {
            id: self.id,
            supplier_id: self.supplier_id,
            title: self.title,
            price_cents: self.price_cents,
            declared_rating: self.declared_rating,
            remaining_item_count: count_from_db(self.remaining_item_count),
            grade: self.grade,
            bundle_type: self.bundle_type,
            quantity: count_from_db(self.quantity),
            sorting_level: self.sorting_level,
            sample_image: self.sample_image,
            status: self.status.parse()?,
            purchased_by: self.purchased_by,
            date_listed: self.date_listed,
        })
    }
}

#[async_trait]
impl BundleRepository for StoreBundleRepository {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>> {
        Ok(self.fetch("id = $1", Some(id)).await?.into_iter().next())
    }

    async fn list_available(&self) -> CoreResult<Vec<Bundle>> {
        self.fetch("status = 'AVAILABLE'", None).await
    }

    async fn is_available(&self, id: Uuid) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bundles WHERE id = $1 AND status = 'AVAILABLE')")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>> {
        self.fetch("supplier_id = $1", Some(supplier_id)).await
    }

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>> {
        self.fetch("status = 'PURCHASED' AND purchased_by = $1", Some(reseller_id)).await
    }

    async fn mark_purchased(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bundles SET status = 'PURCHASED', purchased_by = $2 WHERE id = $1 AND status = 'AVAILABLE'",
        )
        .bind(id)
        .bind(reseller_id)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: Uuid, reseller_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bundles SET status = 'AVAILABLE', purchased_by = NULL \
             WHERE id = $1 AND status = 'PURCHASED' AND purchased_by = $2",
        )
        .bind(id)
        .bind(reseller_id)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }

    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bundles SET remaining_item_count = remaining_item_count - 1 \
             WHERE id = $1 AND remaining_item_count > 0",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE bundles SET remaining_item_count = remaining_item_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn count_bundles(&self) -> CoreResult<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bundles")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(n.max(0) as u64)
    }
}

// ============================================================================
// Products
// ============================================================================

pub struct StoreProductRepository {
    pool: PgPool,
}

impl StoreProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, filter: &str, value: Uuid) -> CoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT id, reseller_id, supplier_id, bundle_id, title, price_cents, rating, grade, image_url, \
             status, created_at FROM products WHERE {} ORDER BY created_at",
            filter
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        rows.into_iter().map(ProductRow::into_product).collect()
    }

    async fn set_status(&self, id: Uuid, from: ProductStatus, to: ProductStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE products SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    reseller_id: Uuid,
    supplier_id: Uuid,
    bundle_id: Uuid,
    title: String,
    price_cents: i64,
    rating: f64,
    grade: String,
    image_url: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> CoreResult<Product> {
        Ok(Product {
            id: self.id,
            reseller_id: self.reseller_id,
            supplier_id: self.supplier_id,
            bundle_id: self.bundle_id,
            title: self.title,
            price_cents: self.price_cents,
            rating: self.rating,
            grade: self.grade,
            image_url: self.image_url,
            status: self.status.parse()?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ProductRepository for StoreProductRepository {
    async fn create_product(&self, product: &Product) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, reseller_id, supplier_id, bundle_id, title, price_cents, rating,
                                  grade, image_url, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id)
        .bind(product.reseller_id)
        .bind(product.supplier_id)
        .bind(product.bundle_id)
        .bind(&product.title)
        .bind(product.price_cents)
        .bind(product.rating)
        .bind(&product.grade)
        .bind(&product.image_url)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>> {
        Ok(self.fetch("id = $1", id).await?.into_iter().next())
    }

    async fn update_product(&self, product: &Product) -> CoreResult<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET title = $2, price_cents = $3, rating = $4, grade = $5, image_url = $6, status = $7
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(product.price_cents)
        .bind(product.rating)
        .bind(&product.grade)
        .bind(&product.image_url)
        .bind(product.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn mark_sold(&self, id: Uuid) -> CoreResult<bool> {
        self.set_status(id, ProductStatus::Available, ProductStatus::Sold).await
    }

    async fn mark_available(&self, id: Uuid) -> CoreResult<bool> {
        self.set_status(id, ProductStatus::Sold, ProductStatus::Available).await
    }

    async fn delete_product(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>> {
        self.fetch("reseller_id = $1", reseller_id).await
    }

    async fn list_sold_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Product>> {
        self.fetch("reseller_id = $1 AND status = 'SOLD'", reseller_id).await
    }
}

// ============================================================================
// Warehouse
// ============================================================================

pub struct StoreWarehouseRepository {
    pool: PgPool,
}

impl StoreWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, filter: &str, a: Uuid, b: Option<Uuid>) -> CoreResult<Vec<WarehouseItem>> {
        let sql = format!(
            "SELECT id, bundle_id, reseller_id, status, declared_rating, remaining_item_count, grade, \
             bundle_type, quantity, sorting_level, sample_image, created_at \
             FROM warehouse_items WHERE {} ORDER BY created_at",
            filter
        );
        let mut query = sqlx::query_as::<_, WarehouseRow>(&sql).bind(a);
        if let Some(b) = b {
            query = query.bind(b);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(CoreError::repository)?;
        rows.into_iter().map(WarehouseRow::into_item).collect()
    }

    async fn transition(&self, id: Uuid, to: WarehouseStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE warehouse_items SET status = $1 WHERE id = $2 AND status = 'PENDING'")
            .bind(to.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(sqlx::FromRow)]
struct WarehouseRow {
    id: Uuid,
    bundle_id: Uuid,
    reseller_id: Uuid,
    status: String,
    declared_rating: f64,
    remaining_item_count: i32,
    grade: String,
    bundle_type: String,
    quantity: i32,
    sorting_level: String,
    sample_image: String,
    created_at: DateTime<Utc>,
}

impl WarehouseRow {
    fn into_item(self) -> CoreResult<WarehouseItem> {
        Ok(WarehouseItem {
            id: self.id,
            bundle_id: self.bundle_id,
            reseller_id: self.reseller_id,
            status: self.status.parse()?,
            declared_rating: self.declared_rating,
            remaining_item_count: count_from_db(self.remaining_item_count),
            grade: self.grade,
            bundle_type: self.bundle_type,
            quantity: count_from_db(self.quantity),
            sorting_level: self.sorting_level,
            sample_image: self.sample_image,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl WarehouseRepository for StoreWarehouseRepository {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_items (id, bundle_id, reseller_id, status, declared_rating, remaining_item_count,
                                         grade, bundle_type, quantity, sorting_level, sample_image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(item.id)
        .bind(item.bundle_id)
        .bind(item.reseller_id)
        .bind(item.status.as_str())
        .bind(item.declared_rating)
        .bind(count_to_db(item.remaining_item_count)?)
        .bind(&item.grade)
        .bind(&item.bundle_type)
        .bind(count_to_db(item.quantity)?)
        .bind(&item.sorting_level)
        .bind(&item.sample_image)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        Ok(self.fetch("id = $1", id, None).await?.into_iter().next())
    }

    async fn remove_item(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM warehouse_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        self.fetch("reseller_id = $1", reseller_id, None).await
    }

    async fn get_by_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        Ok(self
            .fetch("reseller_id = $1 AND bundle_id = $2", reseller_id, Some(bundle_id))
            .await?
            .into_iter()
            .next())
    }

    async fn mark_listed(&self, id: Uuid) -> CoreResult<bool> {
        self.transition(id, WarehouseStatus::Listed).await
    }

    async fn mark_skipped(&self, id: Uuid) -> CoreResult<bool> {
        self.transition(id, WarehouseStatus::Skipped).await
    }

    async fn decrease_remaining(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE warehouse_items SET remaining_item_count = remaining_item_count - 1 \
             WHERE id = $1 AND remaining_item_count > 0",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(result.rows_affected() == 1)
    }

    async fn restore_remaining(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE warehouse_items SET remaining_item_count = remaining_item_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn count_skipped(&self) -> CoreResult<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM warehouse_items WHERE status = 'SKIPPED'")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(n.max(0) as u64)
    }
}
