use axum::{http::Method, middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod middleware;
pub mod purchases;
pub mod reports;
pub mod reviews;
pub mod state;
pub mod telemetry;
pub mod warehouse;
pub mod worker;

pub use state::{AppState, Runtime};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let api = Router::new()
        .merge(purchases::routes())
        .merge(warehouse::routes())
        .merge(reviews::routes())
        .merge(reports::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::require_identity));

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(telemetry::metrics_handler))
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // needs ConnectInfo, so only when served with peer addresses
    if state.redis.is_some() {
        router = router.layer(from_fn_with_state(state.clone(), middleware::rate_limit_middleware));
    }

    router.with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
