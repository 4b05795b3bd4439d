//! Reputation scoring for suppliers and resellers.
//!
//! [`engine::recompute`] is a pure fold of one rating event into a [`TrustProfile`].
//! [`worker`] moves that fold off the request path behind a bounded queue.

pub mod engine;
pub mod worker;

pub use engine::{recompute, TrustPolicy};
pub use worker::{channel, TrustError, TrustPublisher, TrustStats, TrustStatsSnapshot, TrustWorker};

pub use bale_core::TrustProfile;
