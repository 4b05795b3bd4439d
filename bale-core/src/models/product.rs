use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Available,
    Sold,
}

wire_enum!(ProductStatus {
    Available => "AVAILABLE",
    Sold => "SOLD",
});

/// A single item a reseller carved out of a bundle and listed for retail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub supplier_id: Uuid,
    pub bundle_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub rating: f64,
    pub grade: String,
    pub image_url: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }
}
