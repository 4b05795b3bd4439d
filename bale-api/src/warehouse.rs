use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use bale_core::{Product, Role, WarehouseItem};
use bale_order::metrics::WarehouseView;
use bale_order::{ListingUpdate, ProductDraft};

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/warehouse", get(list_items))
        .route("/v1/warehouse/{id}/skip", post(skip_item))
        .route("/v1/bundles/{id}/products", post(list_product))
        .route("/v1/products/{id}", patch(update_listing).delete(delete_listing))
}

/// GET /v1/warehouse
async fn list_items(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<WarehouseView>>, AppError> {
    identity.require(Role::Reseller)?;
    Ok(Json(state.reporting.warehouse_items(identity.user_id).await?))
}

/// POST /v1/warehouse/{id}/skip
async fn skip_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<WarehouseItem>, AppError> {
    identity.require(Role::Reseller)?;
    let item = state.scheduler.machine().skip(item_id, identity.user_id).await?;
    Ok(Json(item))
}

/// POST /v1/bundles/{id}/products
async fn list_product(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(bundle_id): Path<Uuid>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    identity.require(Role::Reseller)?;
    let product = state.unpack.list_product(identity.user_id, bundle_id, draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /v1/products/{id}
async fn update_listing(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<Uuid>,
    Json(update): Json<ListingUpdate>,
) -> Result<Json<Product>, AppError> {
    identity.require(Role::Reseller)?;
    Ok(Json(state.unpack.update_listing(identity.user_id, product_id, update).await?))
}

/// DELETE /v1/products/{id}
async fn delete_listing(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    identity.require(Role::Reseller)?;
    state.unpack.delete_listing(identity.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
