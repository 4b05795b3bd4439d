use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A consumer's rating of one product. At most one per (reviewer, product).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRating {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub product_id: Uuid,
    pub order_id: Uuid,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

impl ReviewRating {
    pub fn new(reviewer_id: Uuid, product_id: Uuid, order_id: Uuid, rating: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reviewer_id,
            product_id,
            order_id,
            rating,
            created_at: Utc::now(),
        }
    }
}
