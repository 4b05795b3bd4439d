mod common;

use bale_order::*;
use bale_core::*;
use common::Harness;

#[tokio::test]
async fn test_supplier_dashboard() {
    let h = Harness::new();
    let supplier = h.user("supplier", Role::Supplier).await;
    let reseller = h.user("reseller", Role::Reseller).await;
    let sold = h.bundle(supplier.id, 50_000, 40, 4.0).await;
    h.bundle(supplier.id, 20_000, 10, 4.0).await;
    h.orders.purchase_bundle(sold.id, reseller.id).await.unwrap();

    let dashboard = h.reporting.dashboard_metrics(supplier.id).await.unwrap();
    assert_eq!(dashboard.total_bundles_listed, 2);
    assert_eq!(dashboard.sold_count, 1);
    assert_eq!(dashboard.active_count, 1);
    assert_eq!(dashboard.total_sales_cents, 50_000);
    assert_eq!(dashboard.best_selling_cents, 50_000);
    assert_eq!(dashboard.rating, Some(100));

    let reseller_view = h.reporting.reseller_metrics(reseller.id).await.unwrap();
    assert_eq!(reseller_view.total_bought_bundles, 1);
    assert_eq!(reseller_view.total_items_sold, 0);
    assert_eq!(reseller_view.bought_bundles[0].id, sold.id);
}

#[tokio::test]
async fn test_admin_metrics() {
    let h = Harness::new();
    let supplier = h.user("supplier", Role::Supplier).await;
    let reseller = h.user("reseller", Role::Reseller).await;
    let consumer = h.user("consumer", Role::Consumer).await;
    let bundle = h.bundle(supplier.id, 50_000, 40, 4.0).await;
    h.bundle(supplier.id, 20_000, 10, 4.0).await;
    let item = h.orders.purchase_bundle(bundle.id, reseller.id).await.unwrap().warehouse_item;
    let product = h.product(reseller.id, "Cashmere sweater", 10_000).await;
    h.orders.purchase_product(product.id, consumer.id, 10_000).await.unwrap();
    h.scheduler().machine().skip(item.id, reseller.id).await.unwrap();

    let metrics = h.reporting.admin_metrics().await.unwrap();
    assert_eq!(metrics.total_bundles, 2);
    assert_eq!(metrics.total_users, 3);
    assert_eq!(metrics.total_sales_cents, 60_000);
    assert_eq!(metrics.platform_fees_cents, 1_200);
    assert_eq!(metrics.skipped_items, 1);
}

#[tokio::test]
async fn test_order_histories_resolve_names() {
    let h = Harness::new();
    let supplier = h.user("acme-bales", Role::Supplier).await;
    let reseller = h.user("thrift-queen", Role::Reseller).await;
    let consumer = h.user("shopper", Role::Consumer).await;
    let bundle = h.bundle(supplier.id, 25_000, 12, 4.0).await;
    h.orders.purchase_bundle(bundle.id, reseller.id).await.unwrap();
    let product = h.product(reseller.id, "Varsity jacket", 6_000).await;
    h.orders.purchase_product(product.id, consumer.id, 6_000).await.unwrap();

    let reseller_history = h.reporting.orders_by_reseller(reseller.id).await.unwrap();
    assert_eq!(reseller_history.orders.len(), 2);
    assert_eq!(reseller_history.user_names.get(&supplier.id).map(String::as_str), Some("acme-bales"));
    assert_eq!(reseller_history.user_names.get(&consumer.id).map(String::as_str), Some("shopper"));

    let consumer_history = h.reporting.orders_by_consumer(consumer.id).await.unwrap();
    assert_eq!(consumer_history.orders.len(), 1);
    assert_eq!(consumer_history.user_names.get(&reseller.id).map(String::as_str), Some("thrift-queen"));
    assert_eq!(consumer_history.product_titles.get(&product.id).map(String::as_str), Some("Varsity jacket"));

    let sold = h.reporting.sold_bundle_history(supplier.id).await.unwrap();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].bundle_title.as_deref(), Some("90s denim lot"));
    assert_eq!(sold[0].reseller_name.as_deref(), Some("thrift-queen"));

    let supplier_history = h.reporting.orders_by_supplier(supplier.id).await.unwrap();
    assert_eq!(supplier_history.orders.len(), 1);
}

#[tokio::test]
async fn test_warehouse_view_skips_missing_bundles() {
    let h = Harness::new();
    let supplier = h.user("supplier", Role::Supplier).await;
    let reseller = h.user("reseller", Role::Reseller).await;
    let kept = h.bundle(supplier.id, 10_000, 5, 4.0).await;
    let gone = h.bundle(supplier.id, 12_000, 5, 4.0).await;
    h.orders.purchase_bundle(kept.id, reseller.id).await.unwrap();
    h.orders.purchase_bundle(gone.id, reseller.id).await.unwrap();
    h.store.bundles.remove_bundle(gone.id).await;

    let views = h.reporting.warehouse_items(reseller.id).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].item.bundle_id, kept.id);
    assert_eq!(views[0].bundle_title, "90s denim lot");
}

#[tokio::test]
async fn test_payment_history_by_type() {
    let h = Harness::new();
    let supplier = h.user("supplier", Role::Supplier).await;
    let reseller = h.user("reseller", Role::Reseller).await;
    let consumer = h.user("consumer", Role::Consumer).await;
    let bundle = h.bundle(supplier.id, 50_000, 40, 4.0).await;
    h.orders.purchase_bundle(bundle.id, reseller.id).await.unwrap();
    let product = h.product(reseller.id, "Wool coat", 8_000).await;
    h.orders.purchase_product(product.id, consumer.id, 8_000).await.unwrap();

    let all = h.reporting.payment_history(reseller.id, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let bought = h.reporting.payment_history(reseller.id, Some(PaymentType::B2b)).await.unwrap();
    assert_eq!(bought.len(), 1);
    assert_eq!(bought[0].amount_cents, 50_000);
    assert_eq!(bought[0].to_user_id, supplier.id);

    let sold = h.reporting.payment_history(reseller.id, Some(PaymentType::B2c)).await.unwrap();
    assert_eq!(sold[0].seller_earning_cents, 7_840);
    assert_eq!(h.reporting.payment_history(supplier.id, Some(PaymentType::B2c)).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_available_bundles_drop_purchased_ones() {
    let h = Harness::new();
    let supplier = h.user("supplier", Role::Supplier).await;
    let reseller = h.user("reseller", Role::Reseller).await;
    let sold = h.bundle(supplier.id, 50_000, 40, 4.0).await;
    let open = h.bundle(supplier.id, 20_000, 10, 4.0).await;
    assert_eq!(h.reporting.available_bundles().await.unwrap().len(), 2);

    h.orders.purchase_bundle(sold.id, reseller.id).await.unwrap();
    let catalog = h.reporting.available_bundles().await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].id, open.id);
}
