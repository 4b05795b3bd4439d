use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bale_order::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("internal error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let msg = err.to_string();
        match err {
            OrderError::NotFound { .. } => AppError::NotFoundError(msg),
            OrderError::Conflict(_) | OrderError::ItemUnavailable { .. } | OrderError::InvalidTransition { .. } => {
                AppError::ConflictError(msg)
            }
            OrderError::PaymentFailed(_) => AppError::PaymentRequired(msg),
            OrderError::EmptyCart | OrderError::Validation(_) => AppError::ValidationError(msg),
            OrderError::Forbidden(_) => AppError::AuthorizationError(msg),
            OrderError::Repository(_) => AppError::InternalServerError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_order::ConflictKind;
    use uuid::Uuid;

    fn status_of(err: OrderError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_order_errors_map_to_http() {
        assert_eq!(status_of(OrderError::not_found("bundle", Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(OrderError::Conflict(ConflictKind::SelfPurchase)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(OrderError::ItemUnavailable { listing_id: Uuid::nil(), title: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(OrderError::PaymentFailed("declined".into())), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status_of(OrderError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OrderError::Forbidden("no".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(OrderError::Repository("disk".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display_keeps_the_order_message() {
        let err = AppError::from(OrderError::Conflict(ConflictKind::AlreadyReviewed));
        assert_eq!(err.to_string(), "Conflict: you already reviewed this item");
        assert_eq!(
            AppError::InternalServerError("pool closed".into()).to_string(),
            "internal error: pool closed"
        );
    }
}
