use std::sync::Arc;

use tracing::info;

use bale_core::payment::PaymentGateway;
use bale_order::{
    CheckoutOrchestrator, FeeSchedule, FulfillmentScheduler, OrderOrchestrator, PaymentComputer, ReportingService,
    Repositories, ReviewRatingService, SchedulerPolicy, SimulatedGateway, UnpackService,
};
use bale_store::app_config::{BusinessRules, Config, SchedulerConfig, StorageBackend};
use bale_store::inventory_repo::{StoreBundleRepository, StoreProductRepository, StoreWarehouseRepository};
use bale_store::job_repo::StoreJobStore;
use bale_store::order_repo::{StoreOrderRepository, StorePaymentRepository};
use bale_store::user_repo::{StoreCartRepository, StoreRatingRepository, StoreUserRepository};
use bale_store::{DbClient, MemoryStore, RedisClient, RedisJobStore};
use bale_trust::{TrustPolicy, TrustStats, TrustWorker};

use crate::telemetry::Telemetry;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderOrchestrator>,
    pub scheduler: Arc<FulfillmentScheduler>,
    pub checkout: Arc<CheckoutOrchestrator>,
    pub unpack: Arc<UnpackService>,
    pub reviews: Arc<ReviewRatingService>,
    pub reporting: Arc<ReportingService>,
    pub redis: Option<Arc<RedisClient>>,
    pub telemetry: Arc<Telemetry>,
    pub trust_stats: Arc<TrustStats>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
}

/// Everything `main` needs: the router state plus the worker that drains trust events.
pub struct Runtime {
    pub state: AppState,
    pub trust_worker: TrustWorker,
}

impl AppState {
    /// Wires the services over already-built storage. `config.business_rules` must already carry
    /// any database overrides.
    pub fn assemble(
        config: &Config,
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        redis: Option<Arc<RedisClient>>,
    ) -> Result<Runtime, prometheus::Error> {
        let rules = &config.business_rules;
        let payments = Arc::new(PaymentComputer::new(gateway, fee_schedule(rules)));
        let scheduler = Arc::new(FulfillmentScheduler::new(
            repos.jobs.clone(),
            repos.orders.clone(),
            repos.warehouse.clone(),
            scheduler_policy(rules, &config.scheduler),
        ));
        let orders = Arc::new(OrderOrchestrator::new(repos.clone(), payments, scheduler.clone()));

        let (publisher, trust_worker) =
            bale_trust::channel(repos.users.clone(), trust_policy(rules), rules.trust_queue_capacity);

        let state = AppState {
            checkout: Arc::new(CheckoutOrchestrator::new(orders.clone())),
            unpack: Arc::new(UnpackService::new(orders.clone(), publisher.clone())),
            reviews: Arc::new(ReviewRatingService::new(repos.clone(), publisher.clone())),
            reporting: Arc::new(ReportingService::new(repos)),
            orders,
            scheduler,
            redis,
            telemetry: Arc::new(Telemetry::new()?),
            trust_stats: publisher.stats(),
            auth: AuthConfig { secret: config.auth.jwt_secret.clone() },
            rate_limit_per_minute: config.server.rate_limit_per_minute,
        };
        Ok(Runtime { state, trust_worker })
    }

    /// Picks storage from configuration. Jobs go to Redis when configured, otherwise they
    /// live next to the rest of the data.
    pub async fn from_config(config: &Config) -> anyhow::Result<Runtime> {
        let redis = if config.redis.url.is_empty() {
            None
        } else {
            Some(Arc::new(RedisClient::new(&config.redis.url).await?))
        };

        let mut config = config.clone();
        let mut repos = match config.storage.backend {
            StorageBackend::Memory => {
                info!("using in-memory storage");
                memory_repositories(&MemoryStore::new())
            }
            StorageBackend::Postgres => {
                let db = DbClient::new(&config.database.url).await?;
                db.migrate().await?;
                config.business_rules = db.fetch_business_rules(config.business_rules.clone()).await?;
                info!("using postgres storage");
                postgres_repositories(&db)
            }
        };

        if let Some(redis) = &redis {
            info!("delayed transitions stored in redis");
            repos.jobs = Arc::new(RedisJobStore::new(redis));
        }

        Ok(Self::assemble(&config, repos, Arc::new(SimulatedGateway::default()), redis)?)
    }
}

pub fn memory_repositories(store: &MemoryStore) -> Repositories {
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

fn postgres_repositories(db: &DbClient) -> Repositories {
    let pool = db.pool.clone();
    Repositories {
        orders: Arc::new(StoreOrderRepository::new(pool.clone())),
        payments: Arc::new(StorePaymentRepository::new(pool.clone())),
        bundles: Arc::new(StoreBundleRepository::new(pool.clone())),
        products: Arc::new(StoreProductRepository::new(pool.clone())),
        warehouse: Arc::new(StoreWarehouseRepository::new(pool.clone())),
        users: Arc::new(StoreUserRepository::new(pool.clone())),
        carts: Arc::new(StoreCartRepository::new(pool.clone())),
        ratings: Arc::new(StoreRatingRepository::new(pool.clone())),
        jobs: Arc::new(StoreJobStore::new(pool)),
    }
}

pub fn fee_schedule(rules: &BusinessRules) -> FeeSchedule {
    FeeSchedule { platform_fee_bps: rules.platform_fee_bps }
}

pub fn trust_policy(rules: &BusinessRules) -> TrustPolicy {
    TrustPolicy {
        window_size: rules.trust_window_size,
        blacklist_threshold: rules.blacklist_threshold,
        historical_weight: rules.historical_weight,
        recent_weight: rules.recent_weight,
    }
}

pub fn scheduler_policy(rules: &BusinessRules, scheduler: &SchedulerConfig) -> SchedulerPolicy {
    SchedulerPolicy {
        fulfillment_delay: chrono::Duration::seconds(rules.fulfillment_delay_seconds as i64),
        delivery_delay: chrono::Duration::seconds(rules.delivery_delay_seconds as i64),
        batch_size: scheduler.batch_size,
        max_attempts: scheduler.max_attempts,
        retry_backoff: chrono::Duration::seconds(scheduler.retry_backoff_seconds as i64),
    }
}
