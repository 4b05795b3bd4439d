use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use bale_core::{CartItem, Role};
use bale_order::{BundlePurchase, CheckoutSummary};

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub listing_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bundles/{id}/purchase", post(purchase_bundle))
        .route("/v1/cart", post(add_to_cart).get(get_cart))
        .route("/v1/cart/{listing_id}", delete(remove_from_cart))
        .route("/v1/cart/checkout", post(checkout_cart))
        .route("/v1/cart/{listing_id}/checkout", post(checkout_single_item))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bundles/{id}/purchase
async fn purchase_bundle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(bundle_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BundlePurchase>), AppError> {
    identity.require(Role::Reseller)?;
    let result = state.orders.purchase_bundle(bundle_id, identity.user_id).await;
    state.telemetry.purchase("bundle", &result);
    Ok((StatusCode::CREATED, Json(result?)))
}

/// GET /v1/cart
async fn get_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<CartItem>>, AppError> {
    Ok(Json(state.checkout.get_cart(identity.user_id).await?))
}

/// POST /v1/cart
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>), AppError> {
    identity.require(Role::Consumer)?;
    let item = state.checkout.add_to_cart(identity.user_id, req.listing_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /v1/cart/{listing_id}
async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.checkout.remove_from_cart(identity.user_id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/cart/checkout
///
/// Lines are bought one by one. A failure part-way leaves earlier lines sold and is still
/// reported as an error.
async fn checkout_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<CheckoutSummary>, AppError> {
    identity.require(Role::Consumer)?;
    let result = state.checkout.checkout_cart(identity.user_id).await;
    state.telemetry.purchase("checkout", &result);
    Ok(Json(result?))
}

/// POST /v1/cart/{listing_id}/checkout
async fn checkout_single_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<CheckoutSummary>, AppError> {
    identity.require(Role::Consumer)?;
    let result = state.checkout.checkout_single_item(identity.user_id, listing_id).await;
    state.telemetry.purchase("checkout", &result);
    Ok(Json(result?))
}
