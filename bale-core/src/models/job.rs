use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// Warehouse item Pending -> Listed
    ListWarehouseItem,
    /// Product order Completed -> Delivered
    MarkOrderDelivered,
}

wire_enum!(JobKind {
    ListWarehouseItem => "LIST_WAREHOUSE_ITEM",
    MarkOrderDelivered => "MARK_ORDER_DELIVERED",
});

/// A delayed state transition that must survive a restart.
/// At most one job exists per (kind, subject).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledJob {
    pub kind: JobKind,
    pub subject_id: Uuid,
    pub due_at: DateTime<Utc>,
    pub attempts: u32,
}

impl ScheduledJob {
    pub fn new(kind: JobKind, subject_id: Uuid, due_at: DateTime<Utc>) -> Self {
        Self { kind, subject_id, due_at, attempts: 0 }
    }

    pub fn key(&self) -> String {
        Self::key_for(self.kind, self.subject_id)
    }

    pub fn key_for(kind: JobKind, subject_id: Uuid) -> String {
        format!("{}:{}", kind.as_str(), subject_id)
    }
}
