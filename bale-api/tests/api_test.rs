use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use bale_api::middleware::Claims;
use bale_api::state::memory_repositories;
use bale_api::{app, AppState, Runtime};
use bale_core::repository::{ProductRepository, UserRepository};
use bale_core::*;
use bale_order::ScriptedGateway;
use bale_store::app_config::Config;
use bale_store::MemoryStore;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: MemoryStore,
    gateway: Arc<ScriptedGateway>,
}

fn test_config() -> Config {
    serde_json::from_value(json!({
        "server": { "port": 0 },
        "database": { "url": "" },
        "auth": { "jwt_secret": SECRET, "jwt_expiration_seconds": 3600 }
    }))
    .unwrap()
}

fn setup() -> TestApp {
    let store = MemoryStore::new();
    let gateway = Arc::new(ScriptedGateway::default());
    let Runtime { state, .. } =
        AppState::assemble(&test_config(), memory_repositories(&store), gateway.clone(), None).unwrap();
    TestApp { router: app(state), store, gateway }
}

fn token(user: &User) -> String {
    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(app: &TestApp, method: &str, uri: &str, user: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn user(app: &TestApp, name: &str, role: Role) -> User {
    let user = User::new(name, role);
    app.store.users.create_user(&user).await.unwrap();
    user
}

async fn bundle(app: &TestApp, supplier: &User, price_cents: i64) -> Bundle {
    let bundle = Bundle::new(supplier.id, "Mixed knitwear", price_cents, 25, 4.0);
    app.store.bundles.insert_bundle(&bundle).await;
    bundle
}

async fn product(app: &TestApp, reseller: &User, title: &str, price_cents: i64) -> Product {
    let product = Product {
        id: Uuid::new_v4(),
        reseller_id: reseller.id,
        supplier_id: Uuid::new_v4(),
        bundle_id: Uuid::new_v4(),
        title: title.to_string(),
        price_cents,
        rating: 4.0,
        grade: "A".to_string(),
        image_url: String::new(),
        status: ProductStatus::Available,
        created_at: chrono::Utc::now(),
    };
    app.store.products.create_product(&product).await.unwrap();
    product
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_routes_require_a_valid_token() {
    let app = setup();
    let (status, _) = send(&app, "GET", "/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/cart")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bundle_purchase_over_http() {
    let app = setup();
    let supplier = user(&app, "supplier", Role::Supplier).await;
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let late = user(&app, "late", Role::Reseller).await;
    let bundle = bundle(&app, &supplier, 40_000).await;
    let uri = format!("/v1/bundles/{}/purchase", bundle.id);

    let (status, body) = send(&app, "POST", &uri, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["status"], "COMPLETED");
    assert_eq!(body["payment"]["platform_fee_cents"], 800);
    assert_eq!(body["warehouse_item"]["status"], "PENDING");

    let (status, body) = send(&app, "POST", &uri, Some(&late), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("no longer available"));
}

#[tokio::test]
async fn test_role_and_payment_errors() {
    let app = setup();
    let supplier = user(&app, "supplier", Role::Supplier).await;
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let consumer = user(&app, "consumer", Role::Consumer).await;
    let bundle = bundle(&app, &supplier, 15_000).await;
    let uri = format!("/v1/bundles/{}/purchase", bundle.id);

    let (status, _) = send(&app, "POST", &uri, Some(&consumer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.gateway.decline_next("card declined");
    let (status, body) = send(&app, "POST", &uri, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("card declined"));

    let missing = format!("/v1/bundles/{}/purchase", Uuid::new_v4());
    let (status, _) = send(&app, "POST", &missing, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_checkout_over_http() {
    let app = setup();
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let consumer = user(&app, "consumer", Role::Consumer).await;
    let first = product(&app, &reseller, "Puffer vest", 10_000).await;
    let second = product(&app, &reseller, "Cargo pants", 20_000).await;

    let (status, _) = send(&app, "POST", "/v1/cart/checkout", Some(&consumer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for listing in [first.id, second.id] {
        let (status, _) = send(&app, "POST", "/v1/cart", Some(&consumer), Some(json!({ "listing_id": listing }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, cart) = send(&app, "GET", "/v1/cart", Some(&consumer), None).await;
    assert_eq!(cart.as_array().unwrap().len(), 2);

    let (status, summary) = send(&app, "POST", "/v1/cart/checkout", Some(&consumer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_cents"], 30_000);
    assert_eq!(summary["platform_fee_cents"], 600);
    assert_eq!(summary["net_payable_cents"], 29_400);

    let (_, cart) = send(&app, "GET", "/v1/cart", Some(&consumer), None).await;
    assert!(cart.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_skip_warehouse_item_twice() {
    let app = setup();
    let supplier = user(&app, "supplier", Role::Supplier).await;
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let bundle = bundle(&app, &supplier, 9_000).await;
    let uri = format!("/v1/bundles/{}/purchase", bundle.id);
    let (_, purchase) = send(&app, "POST", &uri, Some(&reseller), None).await;
    let item_id = purchase["warehouse_item"]["id"].as_str().unwrap().to_string();

    let skip = format!("/v1/warehouse/{}/skip", item_id);
    let (status, body) = send(&app, "POST", &skip, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SKIPPED");

    let (status, _) = send(&app, "POST", &skip, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, views) = send(&app, "GET", "/v1/warehouse", Some(&reseller), None).await;
    assert_eq!(views[0]["bundle_title"], "Mixed knitwear");
}

#[tokio::test]
async fn test_metrics_expose_purchase_counters() {
    let app = setup();
    let supplier = user(&app, "supplier", Role::Supplier).await;
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let bundle = bundle(&app, &supplier, 9_000).await;
    send(&app, "POST", &format!("/v1/bundles/{}/purchase", bundle.id), Some(&reseller), None).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("bale_purchases_total{kind=\"bundle\",outcome=\"ok\"} 1"));
    assert!(text.contains("bale_scheduled_jobs_pending 1"));
}

#[tokio::test]
async fn test_listing_edit_and_payment_history() {
    let app = setup();
    let supplier = user(&app, "supplier", Role::Supplier).await;
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let bundle = bundle(&app, &supplier, 12_000).await;
    send(&app, "POST", &format!("/v1/bundles/{}/purchase", bundle.id), Some(&reseller), None).await;
    let (_, catalog) = send(&app, "GET", "/v1/bundles", Some(&reseller), None).await;
    assert_eq!(catalog.as_array().unwrap().len(), 0);
    let product = product(&app, &reseller, "Denim shirt", 3_000).await;
    let uri = format!("/v1/products/{}", product.id);

    let (status, body) = send(&app, "PATCH", &uri, Some(&reseller), Some(json!({ "price_cents": 2_500 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price_cents"], 2_500);

    let (status, _) = send(&app, "DELETE", &uri, Some(&supplier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, payments) = send(&app, "GET", "/v1/payments?type=B2B", Some(&supplier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["amount_cents"], 12_000);
    assert_eq!(payments[0]["payment_type"], "B2B");
}

#[tokio::test]
async fn test_products_are_bought_through_checkout_and_reviewed_once() {
    let app = setup();
    let reseller = user(&app, "reseller", Role::Reseller).await;
    let consumer = user(&app, "consumer", Role::Consumer).await;
    let latecomer = user(&app, "latecomer", Role::Consumer).await;
    let product = product(&app, &reseller, "Rain mac", 6_000).await;

    let direct = format!("/v1/products/{}/purchase", product.id);
    let (status, _) = send(&app, "POST", &direct, Some(&consumer), Some(json!({ "total_price_cents": 0 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "POST", "/v1/cart", Some(&consumer), Some(json!({ "listing_id": product.id }))).await;
    let express = format!("/v1/cart/{}/checkout", product.id);
    let (status, summary) = send(&app, "POST", &express, Some(&consumer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_cents"], 6_000);
    let order_id = summary["orders"][0]["id"].clone();

    let (status, _) = send(&app, "POST", "/v1/cart", Some(&latecomer), Some(json!({ "listing_id": product.id }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let review = json!({ "order_id": order_id, "product_id": product.id, "rating": 0.0 });
    let (status, _) = send(&app, "POST", "/v1/reviews", Some(&consumer), Some(review.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, body) = send(&app, "POST", "/v1/reviews", Some(&consumer), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict: you already reviewed this item");
}
