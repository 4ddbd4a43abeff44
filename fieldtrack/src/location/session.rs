//! Session state - the single mutable record of a tracking client.
//!
//! A [`Session`] is owned by exactly one tracker and only ever mutated from
//! inside it. Its methods keep the invariants local:
//!
//! - the subscription handle is present iff the status is `Tracking`
//! - the relaxed retry counter never exceeds [`MAX_RELAXED_RETRIES`]
//! - the attempt token only ever grows, across restarts too
//!
//! # State Machine
//!
//! ```text
//!          start                 fail               fail
//!   Idle ---------> AcquiringHigh ----> AcquiringBalanced ----> AcquiringNetwork
//!                       |                     |                   |       |
//!                       | ok                  | ok             ok |       | fail
//!                       v                     v                   v       v
//!                   Tracking <----------------+-------------------+     Error
//!
//!   any active state --stop--> Stopped --start--> AcquiringHigh
//! ```

use std::fmt;

use super::provider::SubscriptionHandle;
use super::reading::Reading;

/// Upper bound on relaxed one-shot retries per session.
pub const MAX_RELAXED_RETRIES: u32 = 2;

/// Current tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    /// Never started.
    #[default]
    Idle,
    /// One-shot, high accuracy, no cached fixes.
    AcquiringHigh,
    /// One-shot, high accuracy, short cache window.
    AcquiringBalanced,
    /// One-shot, network accuracy, long cache window.
    AcquiringNetwork,
    /// Continuous subscription active.
    Tracking,
    /// Acquisition failed; recoverable via `start()`.
    Error,
    /// Stopped by the caller; recoverable via `start()`.
    Stopped,
}

impl TrackingStatus {
    /// True while a one-shot stage of the cascade is in flight.
    pub fn is_acquiring(&self) -> bool {
        matches!(
            self,
            Self::AcquiringHigh | Self::AcquiringBalanced | Self::AcquiringNetwork
        )
    }

    /// True while starting or tracking; `start()` is a no-op in these states.
    pub fn is_active(&self) -> bool {
        self.is_acquiring() || *self == Self::Tracking
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AcquiringHigh => write!(f, "Acquiring (high accuracy)"),
            Self::AcquiringBalanced => write!(f, "Acquiring (balanced)"),
            Self::AcquiringNetwork => write!(f, "Acquiring (network)"),
            Self::Tracking => write!(f, "Tracking"),
            Self::Error => write!(f, "Error"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time copy of the session for consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: TrackingStatus,
    pub last_accepted: Option<Reading>,
    pub high_accuracy_attempt_count: u32,
    pub has_active_subscription: bool,
}

/// Mutable tracking record.
#[derive(Debug, Default)]
pub struct Session {
    status: TrackingStatus,
    last_accepted: Option<Reading>,
    /// Relaxed retries issued after high-accuracy stages failed.
    high_accuracy_attempt_count: u32,
    active_subscription: Option<SubscriptionHandle>,
    attempt_token: u64,
}

impl Session {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn last_accepted(&self) -> Option<&Reading> {
        self.last_accepted.as_ref()
    }

    pub fn high_accuracy_attempt_count(&self) -> u32 {
        self.high_accuracy_attempt_count
    }

    pub fn active_subscription(&self) -> Option<SubscriptionHandle> {
        self.active_subscription
    }

    /// The token callbacks must present to mutate this session.
    pub fn attempt_token(&self) -> u64 {
        self.attempt_token
    }

    /// Check whether a callback scheduled under `token` is still current.
    pub fn is_current(&self, token: u64) -> bool {
        self.attempt_token == token
    }

    /// Reset for a new acquisition run and return the fresh token.
    ///
    /// Clears the held reading and counters; keeps the token sequence.
    pub fn begin(&mut self) -> u64 {
        debug_assert!(self.active_subscription.is_none());
        self.last_accepted = None;
        self.high_accuracy_attempt_count = 0;
        self.status = TrackingStatus::AcquiringHigh;
        self.advance_token()
    }

    /// Invalidate every outstanding callback.
    pub fn advance_token(&mut self) -> u64 {
        self.attempt_token += 1;
        self.attempt_token
    }

    /// Move to a non-tracking status.
    ///
    /// Returns the subscription handle that was active, which the caller
    /// must cancel with the provider.
    pub fn transition(&mut self, status: TrackingStatus) -> Option<SubscriptionHandle> {
        debug_assert_ne!(status, TrackingStatus::Tracking);
        self.status = status;
        self.active_subscription.take()
    }

    /// Enter `Tracking` with the given subscription.
    pub fn enter_tracking(&mut self, handle: SubscriptionHandle) {
        self.status = TrackingStatus::Tracking;
        self.active_subscription = Some(handle);
    }

    /// Replace the held reading.
    pub fn accept(&mut self, reading: Reading) {
        self.last_accepted = Some(reading);
    }

    /// Count a relaxed retry if the budget allows; returns the attempt number.
    ///
    /// `limit` is capped at [`MAX_RELAXED_RETRIES`].
    pub fn try_record_retry(&mut self, limit: u32) -> Option<u32> {
        if self.high_accuracy_attempt_count >= limit.min(MAX_RELAXED_RETRIES) {
            return None;
        }
        self.high_accuracy_attempt_count += 1;
        Some(self.high_accuracy_attempt_count)
    }

    /// Tear down after `stop()`: counters cleared, held reading kept readable.
    ///
    /// Returns the subscription handle that was active.
    pub fn stop(&mut self) -> Option<SubscriptionHandle> {
        self.advance_token();
        self.high_accuracy_attempt_count = 0;
        self.transition(TrackingStatus::Stopped)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            last_accepted: self.last_accepted,
            high_accuracy_attempt_count: self.high_accuracy_attempt_count,
            has_active_subscription: self.active_subscription.is_some(),
        }
    }
}
