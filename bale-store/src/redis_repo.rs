use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::RedisResult;
use tracing::{debug, warn};
use uuid::Uuid;

use bale_core::repository::JobStore;
use bale_core::{CoreError, CoreResult, JobKind, ScheduledJob};

const DUE_KEY: &str = "jobs:due";
const BODY_KEY: &str = "jobs:body";

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns true while the caller is within `limit`.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// Delayed jobs in a sorted set scored by due time (ms), bodies in a hash.
#[derive(Clone)]
pub struct RedisJobStore {
    client: redis::Client,
}

impl RedisJobStore {
    pub fn new(redis: &RedisClient) -> Self {
        Self { client: redis.client.clone() }
    }

    async fn conn(&self) -> CoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::repository)
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn schedule(&self, job: &ScheduledJob) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let key = job.key();
        let body = serde_json::to_string(job).map_err(CoreError::repository)?;

        redis::pipe()
            .atomic()
            .hset(BODY_KEY, &key, body)
            .ignore()
            .zadd(DUE_KEY, &key, job.due_at.timestamp_millis())
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(CoreError::repository)?;

        debug!(job = %key, due_at = %job.due_at, "job scheduled");
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> CoreResult<Vec<ScheduledJob>> {
        let mut conn = self.conn().await?;

        let keys: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(DUE_KEY)
            .arg("-inf")
            .arg(now.timestamp_millis())
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await
            .map_err(CoreError::repository)?;

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let bodies: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(BODY_KEY)
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(CoreError::repository)?;

        let mut jobs = Vec::with_capacity(keys.len());
        let mut orphans = Vec::new();
        for (key, body) in keys.iter().zip(bodies) {
            match body.map(|b| serde_json::from_str::<ScheduledJob>(&b)) {
                Some(Ok(job)) => jobs.push(job),
                Some(Err(e)) => {
                    warn!(job = %key, error = %e, "unreadable job body, dropping");
                    orphans.push(key.clone());
                }
                None => {
                    warn!(job = %key, "job body missing, dropping");
                    orphans.push(key.clone());
                }
            }
        }

        if !orphans.is_empty() {
            redis::pipe()
                .zrem(DUE_KEY, &orphans)
                .ignore()
                .hdel(BODY_KEY, &orphans)
                .ignore()
                .query_async::<()>(&mut conn)
                .await
                .map_err(CoreError::repository)?;
        }
        Ok(jobs)
    }

    async fn complete(&self, kind: JobKind, subject_id: Uuid) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let key = ScheduledJob::key_for(kind, subject_id);

        redis::pipe()
            .atomic()
            .zrem(DUE_KEY, &key)
            .ignore()
            .hdel(BODY_KEY, &key)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(CoreError::repository)
    }

    async fn pending_count(&self) -> CoreResult<u64> {
        let mut conn = self.conn().await?;
        redis::cmd("ZCARD")
            .arg(DUE_KEY)
            .query_async(&mut conn)
            .await
            .map_err(CoreError::repository)
    }
}
