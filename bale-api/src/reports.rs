use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use bale_core::{Bundle, Payment, PaymentType, Role};
use bale_order::metrics::{AdminMetrics, OrderHistory, ResellerMetrics, SoldBundle, SupplierDashboard};

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(my_orders))
        .route("/v1/bundles", get(available_bundles))
        .route("/v1/payments", get(my_payments))
        .route("/v1/reports/supplier", get(supplier_dashboard))
        .route("/v1/reports/supplier/sold-bundles", get(sold_bundles))
        .route("/v1/reports/reseller", get(reseller_metrics))
        .route("/v1/admin/metrics", get(admin_metrics))
}

/// GET /v1/orders
///
/// The caller's orders from their side of the trade.
async fn my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<OrderHistory>, AppError> {
    let history = match identity.role {
        Role::Reseller => state.reporting.orders_by_reseller(identity.user_id).await?,
        Role::Consumer => state.reporting.orders_by_consumer(identity.user_id).await?,
        Role::Supplier => state.reporting.orders_by_supplier(identity.user_id).await?,
        Role::Admin => return Err(AppError::ValidationError("admins have no orders".to_string())),
    };
    Ok(Json(history))
}

/// GET /v1/bundles
async fn available_bundles(State(state): State<AppState>) -> Result<Json<Vec<Bundle>>, AppError> {
    Ok(Json(state.reporting.available_bundles().await?))
}

#[derive(Debug, Deserialize)]
struct PaymentFilter {
    #[serde(rename = "type")]
    payment_type: Option<PaymentType>,
}

/// GET /v1/payments?type=B2B
async fn my_payments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.reporting.payment_history(identity.user_id, filter.payment_type).await?;
    Ok(Json(payments))
}

async fn supplier_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<SupplierDashboard>, AppError> {
    identity.require(Role::Supplier)?;
    Ok(Json(state.reporting.dashboard_metrics(identity.user_id).await?))
}

async fn sold_bundles(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<SoldBundle>>, AppError> {
    identity.require(Role::Supplier)?;
    Ok(Json(state.reporting.sold_bundle_history(identity.user_id).await?))
}

async fn reseller_metrics(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ResellerMetrics>, AppError> {
    identity.require(Role::Reseller)?;
    Ok(Json(state.reporting.reseller_metrics(identity.user_id).await?))
}

async fn admin_metrics(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<AdminMetrics>, AppError> {
    identity.require(Role::Admin)?;
    Ok(Json(state.reporting.admin_metrics().await?))
}
