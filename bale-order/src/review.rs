use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bale_core::{OrderStatus, ReviewRating};
use bale_shared::models::events::{RatingRecorded, SubjectRole};
use bale_trust::TrustPublisher;

use crate::error::{ConflictKind, OrderError, OrderResult};
use crate::saga::Repositories;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub rating: f64,
}

/// Turns a consumer's review rating into a trust event for the product's reseller.
pub struct ReviewRatingService {
    repos: Repositories,
    trust: TrustPublisher,
}

impl ReviewRatingService {
    pub fn new(repos: Repositories, trust: TrustPublisher) -> Self {
        Self { repos, trust }
    }

    pub async fn record_review(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        reviewer_id: Uuid,
        rating: f64,
    ) -> OrderResult<RatingRecorded> {
        if !(0.0..=5.0).contains(&rating) {
            return Err(OrderError::Validation("rating must be between 0 and 5".to_string()));
        }

        let order = self
            .repos
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::not_found("order", order_id))?;
        if order.consumer_id() != Some(reviewer_id) {
            return Err(OrderError::Forbidden("order belongs to another consumer".to_string()));
        }
        if !order.product_ids().contains(&product_id) {
            return Err(OrderError::Validation("product is not part of this order".to_string()));
        }
        if !matches!(order.status, OrderStatus::Completed | OrderStatus::Delivered) {
            return Err(OrderError::Validation(format!("cannot review a {} order", order.status)));
        }
        if self.repos.ratings.has_rated(reviewer_id, product_id).await? {
            return Err(OrderError::Conflict(ConflictKind::AlreadyReviewed));
        }

        let product = self
            .repos
            .products
            .get_product(product_id)
            .await?
            .ok_or(OrderError::not_found("product", product_id))?;

        // Two concurrent submissions both pass `has_rated`; only one insert wins.
        let record = ReviewRating::new(reviewer_id, product_id, order_id, rating);
        if !self.repos.ratings.record_rating(&record).await? {
            return Err(OrderError::Conflict(ConflictKind::AlreadyReviewed));
        }

        let event = RatingRecorded::new(product.reseller_id, SubjectRole::Reseller, product.rating, rating);
        self.trust.rating_recorded(event.clone());
        info!(%order_id, %product_id, reseller_id = %product.reseller_id, rating, "review rating recorded");
        Ok(event)
    }
}
