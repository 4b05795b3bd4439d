use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bale_core::repository::JobStore;
use bale_core::{CoreError, CoreResult, JobKind, ScheduledJob};

/// Postgres-backed delayed jobs, used when no Redis is configured.
pub struct StoreJobStore {
    pool: PgPool,
}

impl StoreJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    kind: String,
    subject_id: Uuid,
    due_at: DateTime<Utc>,
    attempts: i32,
}

#[async_trait]
impl JobStore for StoreJobStore {
    async fn schedule(&self, job: &ScheduledJob) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_jobs (job_key, kind, subject_id, due_at, attempts)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_key) DO UPDATE SET due_at = EXCLUDED.due_at, attempts = EXCLUDED.attempts
            "#,
        )
        .bind(job.key())
        .bind(job.kind.as_str())
        .bind(job.subject_id)
        .bind(job.due_at)
        .bind(i32::try_from(job.attempts).map_err(CoreError::repository)?)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> CoreResult<Vec<ScheduledJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT kind, subject_id, due_at, attempts FROM scheduled_jobs WHERE due_at <= $1 ORDER BY due_at LIMIT $2",
        )
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::repository)?;

        rows.into_iter()
            .map(|row| {
                Ok(ScheduledJob {
                    kind: row.kind.parse()?,
                    subject_id: row.subject_id,
                    due_at: row.due_at,
                    attempts: u32::try_from(row.attempts).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn complete(&self, kind: JobKind, subject_id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM scheduled_jobs WHERE job_key = $1")
            .bind(ScheduledJob::key_for(kind, subject_id))
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn pending_count(&self) -> CoreResult<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scheduled_jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(n.max(0) as u64)
    }
}
