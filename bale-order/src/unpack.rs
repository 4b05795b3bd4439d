use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use bale_core::{Product, ProductStatus};
use bale_shared::models::events::{RatingRecorded, SubjectRole};
use bale_trust::TrustPublisher;

use crate::error::{ConflictKind, OrderError, OrderResult};
use crate::orchestrator::OrderOrchestrator;
use crate::saga::{Compensation, CompensationLog};

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub price_cents: i64,
    /// Quality the reseller observed, 0 to 5
    pub rating: f64,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub image_url: String,
}

impl ProductDraft {
    fn validate(&self) -> OrderResult<()> {
        if self.title.trim().is_empty() {
            return Err(OrderError::Validation("title is required".to_string()));
        }
        if self.price_cents < 0 {
            return Err(OrderError::Validation("price must not be negative".to_string()));
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(OrderError::Validation("rating must be between 0 and 5".to_string()));
        }
        Ok(())
    }
}

/// Partial edit of a listed product. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub price_cents: Option<i64>,
    pub grade: Option<String>,
    pub image_url: Option<String>,
}

impl ListingUpdate {
    fn apply(self, product: &mut Product) -> OrderResult<()> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(OrderError::Validation("title is required".to_string()));
            }
            product.title = title;
        }
        if let Some(price) = self.price_cents {
            if price < 0 {
                return Err(OrderError::Validation("price must not be negative".to_string()));
            }
            product.price_cents = price;
        }
        if let Some(grade) = self.grade {
            product.grade = grade;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
        Ok(())
    }
}

/// Carves retail products out of a bundle a reseller has received.
pub struct UnpackService {
    orders: Arc<OrderOrchestrator>,
    trust: TrustPublisher,
}

impl UnpackService {
    pub fn new(orders: Arc<OrderOrchestrator>, trust: TrustPublisher) -> Self {
        Self { orders, trust }
    }

    pub async fn list_product(&self, reseller_id: Uuid, bundle_id: Uuid, draft: ProductDraft) -> OrderResult<Product> {
        draft.validate()?;
        let repos = self.orders.repos();

        let item = repos
            .warehouse
            .get_by_bundle(reseller_id, bundle_id)
            .await?
            .ok_or_else(|| OrderError::Forbidden("bundle has not been received by this reseller".to_string()))?;
        let bundle = repos
            .bundles
            .get_bundle(bundle_id)
            .await?
            .ok_or(OrderError::not_found("bundle", bundle_id))?;

        if item.remaining_item_count == 0 || bundle.remaining_item_count == 0 {
            return Err(OrderError::Conflict(ConflictKind::NotAvailable));
        }

        let product = Product {
            id: Uuid::new_v4(),
            reseller_id,
            supplier_id: bundle.supplier_id,
            bundle_id,
            title: draft.title,
            price_cents: draft.price_cents,
            rating: draft.rating,
            grade: draft.grade,
            image_url: draft.image_url,
            status: ProductStatus::Available,
            created_at: Utc::now(),
        };

        let mut log = CompensationLog::new();
        let result = async {
            if !repos.bundles.decrease_remaining(bundle_id).await? {
                return Err(OrderError::Conflict(ConflictKind::NotAvailable));
            }
            log.record(Compensation::RestoreBundleCount(bundle_id));

            if !repos.warehouse.decrease_remaining(item.id).await? {
                return Err(OrderError::Conflict(ConflictKind::NotAvailable));
            }
            log.record(Compensation::RestoreItemCount(item.id));

            repos.products.create_product(&product).await?;
            Ok::<_, OrderError>(())
        }
        .await;

        if let Err(e) = result {
            error!(%bundle_id, %reseller_id, error = %e, "product listing failed, compensating");
            log.unwind(repos, self.orders.payments()).await;
            return Err(e);
        }

        info!(product_id = %product.id, %bundle_id, %reseller_id, "product carved out of bundle");
        self.trust.rating_recorded(RatingRecorded::new(
            bundle.supplier_id,
            SubjectRole::Supplier,
            bundle.declared_rating,
            product.rating,
        ));
        Ok(product)
    }

    /// Loads a product the reseller owns that has not been sold yet.
    async fn owned_listing(&self, reseller_id: Uuid, product_id: Uuid) -> OrderResult<Product> {
        let product = self
            .orders
            .repos()
            .products
            .get_product(product_id)
            .await?
            .ok_or(OrderError::not_found("product", product_id))?;
        if product.reseller_id != reseller_id {
            return Err(OrderError::Forbidden("product belongs to another reseller".to_string()));
        }
        if !product.is_available() {
            return Err(OrderError::Conflict(ConflictKind::NotAvailable));
        }
        Ok(product)
    }

    pub async fn update_listing(&self, reseller_id: Uuid, product_id: Uuid, update: ListingUpdate) -> OrderResult<Product> {
        let mut product = self.owned_listing(reseller_id, product_id).await?;
        update.apply(&mut product)?;
        self.orders.repos().products.update_product(&product).await?;
        info!(%product_id, %reseller_id, "listing updated");
        Ok(product)
    }

    /// Withdraws an unsold listing. The bundle's remaining count is not given back.
    pub async fn delete_listing(&self, reseller_id: Uuid, product_id: Uuid) -> OrderResult<()> {
        self.owned_listing(reseller_id, product_id).await?;
        self.orders.repos().products.delete_product(product_id).await?;
        info!(%product_id, %reseller_id, "listing withdrawn");
        Ok(())
    }
}
