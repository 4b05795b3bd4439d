use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};

use bale_core::Role;
use bale_order::ReviewSubmission;
use bale_shared::models::events::RatingRecorded;

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/reviews", post(submit_review))
}

/// POST /v1/reviews
///
/// 202: the reseller's score is recomputed in the background.
async fn submit_review(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(review): Json<ReviewSubmission>,
) -> Result<(StatusCode, Json<RatingRecorded>), AppError> {
    identity.require(Role::Consumer)?;
    let event = state
        .reviews
        .record_review(review.order_id, review.product_id, identity.user_id, review.rating)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(event)))
}
