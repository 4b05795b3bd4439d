//! Read-side views. Joined records that have disappeared are left out, never an error.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use bale_core::{Bundle, BundleStatus, Order, Payment, PaymentType, WarehouseItem};

use crate::error::OrderResult;
use crate::saga::Repositories;

#[derive(Debug, Clone, Serialize)]
pub struct SupplierDashboard {
    pub total_sales_cents: i64,
    /// Newest first
    pub active_bundles: Vec<Bundle>,
    pub total_bundles_listed: usize,
    pub active_count: usize,
    pub sold_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub best_selling_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResellerMetrics {
    pub total_bought_bundles: usize,
    pub total_items_sold: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    pub best_selling_cents: i64,
    pub bought_bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderHistory {
    pub orders: Vec<Order>,
    /// Counterpart usernames keyed by user id
    pub user_names: HashMap<Uuid, String>,
    /// Product titles keyed by product id (consumer history only)
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub product_titles: HashMap<Uuid, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoldBundle {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reseller_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminMetrics {
    pub total_bundles: u64,
    pub total_users: u64,
    pub total_sales_cents: i64,
    pub platform_fees_cents: i64,
    pub skipped_items: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseView {
    #[serde(flatten)]
    pub item: WarehouseItem,
    pub bundle_title: String,
}

pub struct ReportingService {
    repos: Repositories,
}

impl ReportingService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn username(&self, id: Uuid) -> OrderResult<Option<String>> {
        Ok(self.repos.users.get_user(id).await?.map(|u| u.username))
    }

    async fn names_for(&self, ids: impl IntoIterator<Item = Uuid>) -> OrderResult<HashMap<Uuid, String>> {
        let mut names = HashMap::new();
        for id in ids.into_iter().collect::<HashSet<_>>() {
            if let Some(name) = self.username(id).await? {
                names.insert(id, name);
            }
        }
        Ok(names)
    }

    pub async fn dashboard_metrics(&self, supplier_id: Uuid) -> OrderResult<SupplierDashboard> {
        let bundles = self.repos.bundles.list_by_supplier(supplier_id).await?;
        let rating = self.repos.users.get_user(supplier_id).await?.map(|u| u.trust.trust_score);

        let total_bundles_listed = bundles.len();
        let (sold, mut active): (Vec<Bundle>, Vec<Bundle>) =
            bundles.into_iter().partition(|b| b.status == BundleStatus::Purchased);
        active.sort_by(|a, b| b.date_listed.cmp(&a.date_listed));

        Ok(SupplierDashboard {
            total_sales_cents: sold.iter().map(|b| b.price_cents).sum(),
            best_selling_cents: sold.iter().map(|b| b.price_cents).max().unwrap_or(0),
            sold_count: sold.len(),
            active_count: active.len(),
            active_bundles: active,
            total_bundles_listed,
            rating,
        })
    }

    pub async fn reseller_metrics(&self, reseller_id: Uuid) -> OrderResult<ResellerMetrics> {
        let bought = self.repos.bundles.list_purchased_by_reseller(reseller_id).await?;
        let sold = self.repos.products.list_sold_by_reseller(reseller_id).await?;
        let rating = self.repos.users.get_user(reseller_id).await?.map(|u| u.trust.trust_score);

        Ok(ResellerMetrics {
            total_bought_bundles: bought.len(),
            total_items_sold: sold.len(),
            rating,
            best_selling_cents: sold.iter().map(|p| p.price_cents).max().unwrap_or(0),
            bought_bundles: bought,
        })
    }

    /// Bundles bought (counterpart: supplier) and products sold (counterpart: consumer).
    pub async fn orders_by_reseller(&self, reseller_id: Uuid) -> OrderResult<OrderHistory> {
        let orders = self.repos.orders.list_by_reseller(reseller_id).await?;
        let counterparts = orders.iter().filter_map(|o| o.supplier_id().or(o.consumer_id()));
        let user_names = self.names_for(counterparts.collect::<Vec<_>>()).await?;
        Ok(OrderHistory { orders, user_names, product_titles: HashMap::new() })
    }

    pub async fn orders_by_consumer(&self, consumer_id: Uuid) -> OrderResult<OrderHistory> {
        let orders = self.repos.orders.list_by_consumer(consumer_id).await?;
        let user_names = self.names_for(orders.iter().map(|o| o.reseller_id).collect::<Vec<_>>()).await?;

        let mut product_titles = HashMap::new();
        let product_ids: HashSet<Uuid> = orders.iter().flat_map(|o| o.product_ids().iter().copied()).collect();
        for id in product_ids {
            if let Some(product) = self.repos.products.get_product(id).await? {
                product_titles.insert(id, product.title);
            }
        }
        Ok(OrderHistory { orders, user_names, product_titles })
    }

    pub async fn orders_by_supplier(&self, supplier_id: Uuid) -> OrderResult<OrderHistory> {
        let orders = self.repos.orders.list_by_supplier(supplier_id).await?;
        let user_names = self.names_for(orders.iter().map(|o| o.reseller_id).collect::<Vec<_>>()).await?;
        Ok(OrderHistory { orders, user_names, product_titles: HashMap::new() })
    }

    pub async fn sold_bundle_history(&self, supplier_id: Uuid) -> OrderResult<Vec<SoldBundle>> {
        let orders = self.repos.orders.list_by_supplier(supplier_id).await?;
        let names = self.names_for(orders.iter().map(|o| o.reseller_id).collect::<Vec<_>>()).await?;

        let mut history = Vec::with_capacity(orders.len());
        for order in orders {
            let bundle_title = match order.bundle_id() {
                Some(id) => self.repos.bundles.get_bundle(id).await?.map(|b| b.title),
                None => None,
            };
            history.push(SoldBundle {
                reseller_name: names.get(&order.reseller_id).cloned(),
                bundle_title,
                order,
            });
        }
        Ok(history)
    }

    /// Bundles open for purchase, newest first.
    pub async fn available_bundles(&self) -> OrderResult<Vec<Bundle>> {
        let mut bundles = self.repos.bundles.list_available().await?;
        bundles.sort_by(|a, b| b.date_listed.cmp(&a.date_listed));
        Ok(bundles)
    }

    /// Payments the user made or received, oldest first.
    pub async fn payment_history(&self, user_id: Uuid, payment_type: Option<PaymentType>) -> OrderResult<Vec<Payment>> {
        Ok(self.repos.payments.list_by_user(user_id, payment_type).await?)
    }

    pub async fn admin_metrics(&self) -> OrderResult<AdminMetrics> {
        Ok(AdminMetrics {
            total_bundles: self.repos.bundles.count_bundles().await?,
            total_users: self.repos.users.count_users().await?,
            total_sales_cents: self.repos.payments.total_sales().await?,
            platform_fees_cents: self.repos.payments.total_platform_fees().await?,
            skipped_items: self.repos.warehouse.count_skipped().await?,
        })
    }

    pub async fn warehouse_items(&self, reseller_id: Uuid) -> OrderResult<Vec<WarehouseView>> {
        let items = self.repos.warehouse.list_by_reseller(reseller_id).await?;
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            let Some(bundle) = self.repos.bundles.get_bundle(item.bundle_id).await? else {
                continue;
            };
            views.push(WarehouseView {
                bundle_title: bundle.title,
                item,
            });
        }
        Ok(views)
    }
}
