use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bale_core::repository::UserRepository;
use bale_core::{CoreError, TrustProfile};
use bale_shared::models::events::RatingRecorded;

use crate::engine::{recompute, TrustPolicy};

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Counters for the trust queue, shared between publisher and worker.
#[derive(Debug, Default)]
pub struct TrustStats {
    published: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrustStatsSnapshot {
    pub published: u64,
    pub dropped: u64,
    pub processed: u64,
    pub failed: u64,
}

impl TrustStats {
    pub fn snapshot(&self) -> TrustStatsSnapshot {
        TrustStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Request-side handle. Never blocks the caller.
#[derive(Clone)]
pub struct TrustPublisher {
    tx: mpsc::Sender<RatingRecorded>,
    stats: Arc<TrustStats>,
}

impl TrustPublisher {
    /// Returns false if the event could not be queued.
    pub fn rating_recorded(&self, event: RatingRecorded) -> bool {
        let subject_id = event.subject_id;
        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                debug!(%subject_id, "rating event queued");
                true
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(%subject_id, "trust queue full, rating event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                error!(%subject_id, "trust worker stopped, rating event dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<TrustStats> {
        self.stats.clone()
    }
}

/// Consumes rating events and persists recomputed profiles.
pub struct TrustWorker {
    rx: mpsc::Receiver<RatingRecorded>,
    users: Arc<dyn UserRepository>,
    policy: TrustPolicy,
    stats: Arc<TrustStats>,
}

pub fn channel(users: Arc<dyn UserRepository>, policy: TrustPolicy, capacity: usize) -> (TrustPublisher, TrustWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stats = Arc::new(TrustStats::default());
    (
        TrustPublisher { tx, stats: stats.clone() },
        TrustWorker { rx, users, policy, stats },
    )
}

impl TrustWorker {
    /// Runs until every publisher has been dropped.
    pub async fn run(mut self) {
        info!("Trust worker started");
        while let Some(event) = self.rx.recv().await {
            self.process(&event).await;
        }
        info!("Trust worker stopped");
    }

    /// Processes whatever is queued right now without waiting for more.
    pub async fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.process(&event).await;
            n += 1;
        }
        n
    }

    async fn process(&self, event: &RatingRecorded) {
        let subject_id = event.subject_id;
        match self.handle(event).await {
            Ok(profile) => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
                info!(
                    %subject_id,
                    role = ?event.role,
                    score = profile.trust_score,
                    blacklisted = profile.is_blacklisted,
                    "trust score updated"
                );
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(%subject_id, error = %e, "trust update failed");
            }
        }
    }

    pub async fn handle(&self, event: &RatingRecorded) -> Result<TrustProfile, TrustError> {
        let user = self
            .users
            .get_user(event.subject_id)
            .await?
            .ok_or(TrustError::UserNotFound(event.subject_id))?;

        let updated = recompute(&self.policy, &user.trust, event.declared_rating, event.observed_rating);
        self.users.update_trust_data(user.id, &updated).await?;
        Ok(updated)
    }

    pub fn stats(&self) -> Arc<TrustStats> {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_core::{Role, User};
    use bale_shared::models::events::SubjectRole;
    use bale_store::memory::MemoryUserRepository;

    async fn seeded(role: Role) -> (Arc<MemoryUserRepository>, User) {
        let users = Arc::new(MemoryUserRepository::default());
        let user = User::new("acct", role);
        users.create_user(&user).await.unwrap();
        (users, user)
    }

    #[tokio::test]
    async fn test_worker_persists_recomputed_profile() {
        let (users, supplier) = seeded(Role::Supplier).await;
        let (publisher, worker) = channel(users.clone(), TrustPolicy::default(), 8);
        let stats = publisher.stats();

        assert!(publisher.rating_recorded(RatingRecorded::new(supplier.id, SubjectRole::Supplier, 4.0, 4.5)));
        drop(publisher);
        worker.run().await;

        let stored = users.get_user(supplier.id).await.unwrap().unwrap();
        assert_eq!(stored.trust.trust_score, 95);
        assert_eq!(stored.trust.trust_rated_count, 1);
        assert_eq!(stats.snapshot().processed, 1);
    }

    #[tokio::test]
    async fn test_unknown_subject_is_counted_not_fatal() {
        let (users, reseller) = seeded(Role::Reseller).await;
        let (publisher, worker) = channel(users.clone(), TrustPolicy::default(), 8);
        let stats = publisher.stats();

        publisher.rating_recorded(RatingRecorded::new(Uuid::new_v4(), SubjectRole::Reseller, 4.0, 1.0));
        publisher.rating_recorded(RatingRecorded::new(reseller.id, SubjectRole::Reseller, 3.0, 3.0));
        drop(publisher);
        worker.run().await;

        let snap = stats.snapshot();
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.processed, 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (users, reseller) = seeded(Role::Reseller).await;
        let (publisher, _worker) = channel(users, TrustPolicy::default(), 1);

        assert!(publisher.rating_recorded(RatingRecorded::new(reseller.id, SubjectRole::Reseller, 4.0, 4.0)));
        assert!(!publisher.rating_recorded(RatingRecorded::new(reseller.id, SubjectRole::Reseller, 4.0, 4.0)));
        assert_eq!(publisher.stats().snapshot().dropped, 1);
    }

    #[tokio::test]
    async fn test_drain_processes_queued_events_only() {
        let (users, reseller) = seeded(Role::Reseller).await;
        let (publisher, mut worker) = channel(users.clone(), TrustPolicy::default(), 8);

        assert_eq!(worker.drain().await, 0);
        publisher.rating_recorded(RatingRecorded::new(reseller.id, SubjectRole::Reseller, 2.0, 4.5));
        assert_eq!(worker.drain().await, 1);
        assert_eq!(users.get_user(reseller.id).await.unwrap().unwrap().trust.trust_score, 75);
    }

    #[tokio::test]
    async fn test_handle_reports_missing_user() {
        let users = Arc::new(MemoryUserRepository::default());
        let (_publisher, worker) = channel(users, TrustPolicy::default(), 1);
        let missing = Uuid::new_v4();
        let err = worker
            .handle(&RatingRecorded::new(missing, SubjectRole::Supplier, 1.0, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::UserNotFound(id) if id == missing));
    }
}
