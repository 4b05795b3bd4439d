use uuid::Uuid;

use bale_core::CoreError;

/// Why a purchase was refused even though every record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    SelfPurchase,
    NotAvailable,
    AlreadySold,
    Blacklisted,
    AlreadyReviewed,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ConflictKind::SelfPurchase => "you cannot purchase your own listing",
            ConflictKind::NotAvailable => "listing is no longer available",
            ConflictKind::AlreadySold => "item has already been sold",
            ConflictKind::Blacklisted => "account is blacklisted",
            ConflictKind::AlreadyReviewed => "you already reviewed this item",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Item unavailable: {title} ({listing_id})")]
    ItemUnavailable { listing_id: Uuid, title: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        OrderError::NotFound { entity, id }
    }
}

impl From<CoreError> for OrderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => OrderError::Validation(msg),
            CoreError::RepositoryError(msg) => OrderError::Repository(msg),
            CoreError::GatewayError(msg) => OrderError::PaymentFailed(msg),
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
