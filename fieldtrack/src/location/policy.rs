//! Acceptance policy - hysteresis between a candidate and the last accepted reading.
//!
//! A continuous watch delivers a reading every few seconds, most of them no
//! better than what we already hold. The policy only lets a candidate replace
//! the current reading when one of these holds:
//!
//! 1. Nothing has been accepted yet
//! 2. Accuracy improved by at least 10%
//! 3. The held reading is older than the staleness override (15s)
//! 4. A step change in quality: candidate ≤ 50m while the held one is > 100m
//!
//! Rule 3 can accept a *worse* reading purely because time passed. That keeps
//! the session from stalling under sustained poor signal, at the price of a
//! possible quality regression.

use std::time::Duration;

use super::reading::Reading;

/// Candidate must be below this fraction of the held accuracy to count as better.
pub const IMPROVEMENT_RATIO: f64 = 0.9;

/// Age after which any valid candidate replaces the held reading.
pub const DEFAULT_STALENESS_OVERRIDE: Duration = Duration::from_secs(15);

/// Candidate accuracy (m) that qualifies for the quality step-change rule.
pub const QUALITY_JUMP_CANDIDATE_METERS: f64 = 50.0;

/// Held accuracy (m) above which the quality step-change rule applies.
pub const QUALITY_JUMP_PREVIOUS_METERS: f64 = 100.0;

/// Hysteresis rule set deciding whether a candidate replaces the held reading.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    staleness_override_millis: u64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS_OVERRIDE)
    }
}

impl AcceptancePolicy {
    /// Create a policy with a custom staleness override.
    pub fn new(staleness_override: Duration) -> Self {
        Self {
            staleness_override_millis: staleness_override.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    /// Determine if `candidate` should replace `previous`.
    pub fn should_accept(&self, candidate: &Reading, previous: Option<&Reading>) -> bool {
        let Some(previous) = previous else {
            return true; // First reading ever
        };

        let candidate_accuracy = candidate.accuracy_meters();
        let previous_accuracy = previous.accuracy_meters();

        if candidate_accuracy < previous_accuracy * IMPROVEMENT_RATIO {
            return true;
        }

        // Out-of-order delivery counts as zero elapsed.
        let elapsed = candidate
            .captured_at_millis()
            .saturating_sub(previous.captured_at_millis());
        if elapsed > self.staleness_override_millis {
            return true;
        }

        candidate_accuracy <= QUALITY_JUMP_CANDIDATE_METERS
            && previous_accuracy > QUALITY_JUMP_PREVIOUS_METERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(accuracy: f64, captured_at_millis: u64) -> Reading {
        Reading::new(48.85, 2.35, accuracy, captured_at_millis)
    }

    #[test]
    fn test_first_reading_always_accepted() {
        let policy = AcceptancePolicy::default();
        assert!(policy.should_accept(&at(5_000.0, 0), None));
    }

    #[test]
    fn test_small_improvement_rejected() {
        let policy = AcceptancePolicy::default();
        // 95 is not < 90% of 100, elapsed is short, and 95 > 50
        assert!(!policy.should_accept(&at(95.0, 500), Some(&at(100.0, 0))));
    }

    #[test]
    fn test_ten_percent_improvement_boundary() {
        let policy = AcceptancePolicy::default();
        assert!(!policy.should_accept(&at(27.0, 500), Some(&at(30.0, 0))));
        assert!(policy.should_accept(&at(26.9, 500), Some(&at(30.0, 0))));
    }

    #[test]
    fn test_large_improvement_accepted() {
        let policy = AcceptancePolicy::default();
        assert!(policy.should_accept(&at(40.0, 500), Some(&at(100.0, 0))));
        assert!(policy.should_accept(&at(50.0, 500), Some(&at(101.0, 0))));
    }

    #[test]
    fn test_staleness_override_accepts_worse_reading() {
        let policy = AcceptancePolicy::default();
        let previous = at(20.0, 0);

        assert!(!policy.should_accept(&at(80.0, 15_000), Some(&previous)));
        assert!(policy.should_accept(&at(80.0, 15_001), Some(&previous)));
    }

    #[test]
    fn test_out_of_order_candidate_is_not_stale() {
        let policy = AcceptancePolicy::default();
        let previous = at(20.0, 60_000);
        assert!(!policy.should_accept(&at(20.0, 1_000), Some(&previous)));
    }

    #[test]
    fn test_custom_staleness_override() {
        let policy = AcceptancePolicy::new(Duration::from_secs(1));
        assert!(policy.should_accept(&at(20.0, 1_001), Some(&at(20.0, 0))));
    }
}
