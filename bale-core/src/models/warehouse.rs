use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::bundle::Bundle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseStatus {
    Pending,
    Listed,
    Skipped,
}

wire_enum!(WarehouseStatus {
    Pending => "PENDING",
    Listed => "LISTED",
    Skipped => "SKIPPED",
});

impl WarehouseStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WarehouseStatus::Pending)
    }
}

/// Physical custody of a purchased bundle at a reseller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseItem {
    pub id: Uuid,
    pub bundle_id: Uuid,
    pub reseller_id: Uuid,
    pub status: WarehouseStatus,
    pub declared_rating: f64,
    pub remaining_item_count: u32,
    pub grade: String,
    pub bundle_type: String,
    pub quantity: u32,
    pub sorting_level: String,
    pub sample_image: String,
    pub created_at: DateTime<Utc>,
}

impl WarehouseItem {
    pub fn from_bundle(bundle: &Bundle, reseller_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            bundle_id: bundle.id,
            reseller_id,
            status: WarehouseStatus::Pending,
            declared_rating: bundle.declared_rating,
            remaining_item_count: bundle.remaining_item_count,
            grade: bundle.grade.clone(),
            bundle_type: bundle.bundle_type.clone(),
            quantity: bundle.quantity,
            sorting_level: bundle.sorting_level.clone(),
            sample_image: bundle.sample_image.clone(),
            created_at: Utc::now(),
        }
    }
}
