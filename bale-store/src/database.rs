use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};
use serde_json::Value;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    rule_key: String,
    rule_value: Value,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlays rows of the `business_rules` table onto the configured values.
    /// Rows are stored as `{"value": <number>}`.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows = sqlx::query_as::<_, RuleRow>("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for row in rows {
            if !apply_rule(&mut rules, &row.rule_key, &row.rule_value) {
                warn!(rule = %row.rule_key, "ignoring unknown or malformed business rule");
            }
        }
        Ok(rules)
    }
}

fn apply_rule(rules: &mut BusinessRules, key: &str, raw: &Value) -> bool {
    let Some(v) = raw.get("value") else {
        return false;
    };
    match key {
        "platform_fee_bps" => v.as_i64().map(|x| rules.platform_fee_bps = x).is_some(),
        "fulfillment_delay_seconds" => v.as_u64().map(|x| rules.fulfillment_delay_seconds = x).is_some(),
        "delivery_delay_seconds" => v.as_u64().map(|x| rules.delivery_delay_seconds = x).is_some(),
        "trust_window_size" => v
            .as_u64()
            .and_then(|x| u32::try_from(x).ok())
            .map(|x| rules.trust_window_size = x)
            .is_some(),
        "blacklist_threshold" => v
            .as_i64()
            .and_then(|x| i32::try_from(x).ok())
            .map(|x| rules.blacklist_threshold = x)
            .is_some(),
        "historical_weight" => v.as_f64().map(|x| rules.historical_weight = x).is_some(),
        "recent_weight" => v.as_f64().map(|x| rules.recent_weight = x).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_overlay() {
        let mut rules = BusinessRules::default();
        assert!(apply_rule(&mut rules, "platform_fee_bps", &json!({"value": 300})));
        assert!(apply_rule(&mut rules, "recent_weight", &json!({"value": 0.6})));
        assert!(!apply_rule(&mut rules, "trust_window_size", &json!({"value": "five"})));
        assert!(!apply_rule(&mut rules, "surge_pricing", &json!({"value": 2})));
        assert!(!apply_rule(&mut rules, "blacklist_threshold", &json!(35)));

        assert_eq!(rules.platform_fee_bps, 300);
        assert_eq!(rules.recent_weight, 0.6);
        assert_eq!(rules.trust_window_size, 5);
        assert_eq!(rules.blacklist_threshold, 40);
    }
}
