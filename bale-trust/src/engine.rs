use serde::{Deserialize, Serialize};

use bale_core::TrustProfile;

/// Business parameters of the trust score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Number of recent events the incremental error is spread over
    pub window_size: u32,
    /// Scores strictly below this are blacklisted
    pub blacklist_threshold: i32,
    pub historical_weight: f64,
    pub recent_weight: f64,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            window_size: 5,
            blacklist_threshold: 40,
            historical_weight: 0.3,
            recent_weight: 0.7,
        }
    }
}

impl TrustPolicy {
    pub fn is_blacklisted(&self, score: i32) -> bool {
        score < self.blacklist_threshold
    }
}

const MAX_SCORE: f64 = 100.0;
/// Points lost per unit of average rating error
const ERROR_PENALTY: f64 = 10.0;

/// Folds one declared-vs-observed rating into the profile.
///
/// Keeps O(1) state: the cumulative error and the event count. The "recent" error is the
/// newest event's error spread over `min(count, window_size)` events.
pub fn recompute(policy: &TrustPolicy, profile: &TrustProfile, declared: f64, observed: f64) -> TrustProfile {
    let diff = (observed - declared).abs();

    let (total_error, rated_count) = if profile.trust_rated_count == 0 {
        (0.0, 0)
    } else {
        (profile.trust_total_error, profile.trust_rated_count)
    };

    let new_total_error = total_error + diff;
    let new_rated_count = rated_count + 1;

    let window_error = if rated_count == 0 {
        diff
    } else {
        let window = new_rated_count.min(policy.window_size.max(1));
        (new_total_error - total_error) / f64::from(window)
    };

    let historical = MAX_SCORE - (new_total_error / f64::from(new_rated_count)) * ERROR_PENALTY;
    let recent = MAX_SCORE - window_error * ERROR_PENALTY;

    let blended = (policy.historical_weight * historical + policy.recent_weight * recent).clamp(0.0, MAX_SCORE);
    let trust_score = blended.round() as i32;

    TrustProfile {
        trust_score,
        trust_total_error: new_total_error,
        trust_rated_count: new_rated_count,
        is_blacklisted: policy.is_blacklisted(trust_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(declared: f64, observed: f64) -> TrustProfile {
        recompute(&TrustPolicy::default(), &TrustProfile::default(), declared, observed)
    }

    #[test]
    fn test_exact_match_keeps_full_score() {
        let p = first(4.5, 4.5);
        assert_eq!(p.trust_score, 100);
        assert_eq!(p.trust_total_error, 0.0);
        assert_eq!(p.trust_rated_count, 1);
        assert!(!p.is_blacklisted);
    }

    #[test]
    fn test_half_star_gap_on_first_rating() {
        let p = first(4.0, 4.5);
        assert_eq!(p.trust_score, 95);
        assert_eq!(p.trust_rated_count, 1);
    }

    #[test]
    fn test_large_gap_stays_above_threshold() {
        let p = first(2.0, 4.5);
        assert_eq!(p.trust_score, 75);
        assert!(!p.is_blacklisted);
    }

    #[test]
    fn test_first_event_resets_stale_state() {
        let stale = TrustProfile {
            trust_score: 12,
            trust_total_error: 40.0,
            trust_rated_count: 0,
            is_blacklisted: true,
        };
        let p = recompute(&TrustPolicy::default(), &stale, 4.0, 4.0);
        assert_eq!(p.trust_score, 100);
        assert_eq!(p.trust_total_error, 0.0);
        assert!(!p.is_blacklisted);
    }

    #[test]
    fn test_recent_error_is_spread_over_window() {
        let policy = TrustPolicy::default();
        let mut p = TrustProfile::default();
        for _ in 0..9 {
            p = recompute(&policy, &p, 4.0, 4.0);
        }
        // historical = 100 - 0.4*10 = 96, recent = 100 - (4/5)*10 = 92
        p = recompute(&policy, &p, 1.0, 5.0);
        assert_eq!(p.trust_rated_count, 10);
        assert_eq!(p.trust_total_error, 4.0);
        assert_eq!(p.trust_score, 93);
    }

    #[test]
    fn test_custom_threshold_blacklists() {
        let policy = TrustPolicy { blacklist_threshold: 80, ..TrustPolicy::default() };
        let p = recompute(&policy, &TrustProfile::default(), 2.0, 4.5);
        assert_eq!(p.trust_score, 75);
        assert!(p.is_blacklisted);
    }

    #[test]
    fn test_score_bounds_and_blacklist_invariant() {
        let policy = TrustPolicy::default();
        let steps = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0];
        let mut p = TrustProfile::default();
        for declared in steps {
            for observed in steps {
                p = recompute(&policy, &p, declared, observed);
                assert!((0..=100).contains(&p.trust_score), "score out of range: {}", p.trust_score);
                assert_eq!(p.is_blacklisted, p.trust_score < 40);

                let fresh = recompute(&policy, &TrustProfile::default(), declared, observed);
                assert!((0..=100).contains(&fresh.trust_score));
                assert_eq!(fresh.is_blacklisted, fresh.trust_score < 40);
            }
        }
    }

    #[test]
    fn test_weights_can_push_below_threshold() {
        let policy = TrustPolicy { historical_weight: 0.0, recent_weight: 1.0, ..TrustPolicy::default() };
        let mut p = TrustProfile::default();
        p = recompute(&policy, &p, 0.0, 5.0);
        assert_eq!(p.trust_score, 50);
        assert!(!p.is_blacklisted);

        let harsh = TrustPolicy { historical_weight: 0.0, recent_weight: 0.7, ..TrustPolicy::default() };
        let q = recompute(&harsh, &TrustProfile::default(), 0.0, 5.0);
        assert_eq!(q.trust_score, 35);
        assert!(q.is_blacklisted);
    }
}
