use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Supplier,
    Reseller,
    Consumer,
    Admin,
}

wire_enum!(Role {
    Supplier => "SUPPLIER",
    Reseller => "RESELLER",
    Consumer => "CONSUMER",
    Admin => "ADMIN",
});

/// Reputation state embedded in an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrustProfile {
    pub trust_score: i32,
    pub trust_total_error: f64,
    pub trust_rated_count: u32,
    pub is_blacklisted: bool,
}

impl Default for TrustProfile {
    fn default() -> Self {
        Self {
            trust_score: 100,
            trust_total_error: 0.0,
            trust_rated_count: 0,
            is_blacklisted: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub trust: TrustProfile,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
            trust: TrustProfile::default(),
            created_at: Utc::now(),
        }
    }
}
