use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Marketplace constants. Defaults are the production values.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BusinessRules {
    pub platform_fee_bps: i64,
    pub fulfillment_delay_seconds: u64,
    pub delivery_delay_seconds: u64,
    pub trust_window_size: u32,
    pub blacklist_threshold: i32,
    pub historical_weight: f64,
    pub recent_weight: f64,
    pub trust_queue_capacity: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            platform_fee_bps: 200,
            fulfillment_delay_seconds: 180,
            delivery_delay_seconds: 180,
            trust_window_size: 5,
            blacklist_threshold: 40,
            historical_weight: 0.3,
            recent_weight: 0.7,
            trust_queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub retry_backoff_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_size: 100,
            max_attempts: 5,
            retry_backoff_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 120 }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Empty disables rate limiting and the Redis job store
    #[serde(default)]
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `BALE__BUSINESS_RULES__PLATFORM_FEE_BPS=250`
            .add_source(config::Environment::with_prefix("BALE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rule_defaults() {
        let rules = BusinessRules::default();
        assert_eq!(rules.platform_fee_bps, 200);
        assert_eq!(rules.fulfillment_delay_seconds, 180);
        assert_eq!(rules.trust_window_size, 5);
        assert_eq!(rules.blacklist_threshold, 40);
        assert_eq!(rules.historical_weight, 0.3);
        assert_eq!(rules.recent_weight, 0.7);
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let raw = r#"
            [server]
            port = 8080
            [database]
            url = "postgres://localhost/bale"
            [auth]
            jwt_secret = "s"
            jwt_expiration_seconds = 60
            [business_rules]
            platform_fee_bps = 250
            [storage]
            backend = "postgres"
        "#;
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.business_rules.platform_fee_bps, 250);
        assert_eq!(cfg.business_rules.delivery_delay_seconds, 180);
        assert_eq!(cfg.scheduler, SchedulerConfig::default());
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert!(cfg.redis.url.is_empty());
        assert_eq!(cfg.server.rate_limit_per_minute, 120);
    }
}
