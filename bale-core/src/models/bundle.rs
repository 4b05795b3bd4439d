use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleStatus {
    Available,
    Purchased,
}

wire_enum!(BundleStatus {
    Available => "AVAILABLE",
    Purchased => "PURCHASED",
});

/// A wholesale lot listed by a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub declared_rating: f64,
    pub remaining_item_count: u32,
    pub grade: String,
    pub bundle_type: String,
    pub quantity: u32,
    pub sorting_level: String,
    pub sample_image: String,
    pub status: BundleStatus,
    pub purchased_by: Option<Uuid>,
    pub date_listed: DateTime<Utc>,
}

impl Bundle {
    pub fn new(supplier_id: Uuid, title: impl Into<String>, price_cents: i64, quantity: u32, declared_rating: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier_id,
            title: title.into(),
            price_cents,
            declared_rating,
            remaining_item_count: quantity,
            grade: String::new(),
            bundle_type: String::new(),
            quantity,
            sorting_level: String::new(),
            sample_image: String::new(),
            status: BundleStatus::Available,
            purchased_by: None,
            date_listed: Utc::now(),
        }
    }
}
