#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use bale_core::repository::{ProductRepository, UserRepository};
use bale_core::*;
use bale_order::*;
use bale_store::memory::MemoryStore;
use bale_trust::{TrustPolicy, TrustWorker};

pub fn repositories(store: &MemoryStore) -> Repositories {
    Repositories {
        orders: store.orders.clone(),
        payments: store.payments.clone(),
        bundles: store.bundles.clone(),
        products: store.products.clone(),
        warehouse: store.warehouse.clone(),
        users: store.users.clone(),
        carts: store.carts.clone(),
        ratings: store.ratings.clone(),
        jobs: store.jobs.clone(),
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub gateway: Arc<ScriptedGateway>,
    pub orders: Arc<OrderOrchestrator>,
    pub checkout: CheckoutOrchestrator,
    pub reporting: ReportingService,
    pub unpack: UnpackService,
    pub reviews: ReviewRatingService,
    pub trust_worker: TrustWorker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// A fresh process over existing storage.
    pub fn with_store(store: MemoryStore) -> Self {
        let repos = repositories(&store);
        let gateway = Arc::new(ScriptedGateway::default());
        let payments = Arc::new(PaymentComputer::new(gateway.clone(), FeeSchedule::default()));
        let scheduler = Arc::new(FulfillmentScheduler::new(
            repos.jobs.clone(),
            repos.orders.clone(),
            repos.warehouse.clone(),
            SchedulerPolicy::default(),
        ));
        let orders = Arc::new(OrderOrchestrator::new(repos.clone(), payments, scheduler));
        let (publisher, trust_worker) = bale_trust::channel(repos.users.clone(), TrustPolicy::default(), 64);

        Self {
            checkout: CheckoutOrchestrator::new(orders.clone()),
            reporting: ReportingService::new(repos.clone()),
            unpack: UnpackService::new(orders.clone(), publisher.clone()),
            reviews: ReviewRatingService::new(repos, publisher),
            store,
            gateway,
            orders,
            trust_worker,
        }
    }

    pub fn scheduler(&self) -> &FulfillmentScheduler {
        self.orders.scheduler()
    }

    pub async fn user(&self, name: &str, role: Role) -> User {
        let user = User::new(name, role);
        self.store.users.create_user(&user).await.unwrap();
        user
    }

    pub async fn bundle(&self, supplier_id: Uuid, price_cents: i64, quantity: u32, declared_rating: f64) -> Bundle {
        let mut bundle = Bundle::new(supplier_id, "90s denim lot", price_cents, quantity, declared_rating);
        bundle.grade = "A".to_string();
        bundle.sample_image = "https://img.example/denim.jpg".to_string();
        self.store.bundles.insert_bundle(&bundle).await;
        bundle
    }

    pub async fn product(&self, reseller_id: Uuid, title: &str, price_cents: i64) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            reseller_id,
            supplier_id: Uuid::new_v4(),
            bundle_id: Uuid::new_v4(),
            title: title.to_string(),
            price_cents,
            rating: 4.0,
            grade: "B".to_string(),
            image_url: String::new(),
            status: ProductStatus::Available,
            created_at: chrono::Utc::now(),
        };
        self.store.products.create_product(&product).await.unwrap();
        product
    }
}
