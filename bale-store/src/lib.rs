pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod order_repo;
pub mod inventory_repo;
pub mod user_repo;
pub mod job_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::{RedisClient, RedisJobStore};
