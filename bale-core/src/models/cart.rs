use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::product::Product;

/// A pending purchase line. Price is a snapshot taken at add-to-cart time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub image_url: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(user_id: Uuid, product: &Product) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            listing_id: product.id,
            title: product.title.clone(),
            price_cents: product.price_cents,
            image_url: product.image_url.clone(),
            grade: product.grade.clone(),
            created_at: Utc::now(),
        }
    }
}
