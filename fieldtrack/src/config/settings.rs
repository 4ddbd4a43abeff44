//! Tracker settings and their defaults.

use std::time::Duration;

use crate::location::{
    AcceptancePolicy, NotificationGateway, DEFAULT_ACCEPTED_NOTIFY_INTERVAL,
    DEFAULT_ERROR_NOTIFY_INTERVAL, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_MIN_ACCURACY_METERS,
    DEFAULT_STALENESS_OVERRIDE, MAX_RELAXED_RETRIES,
};

/// Default timeout of the first, high-accuracy one-shot request.
pub const DEFAULT_HIGH_ACCURACY_TIMEOUT: Duration = Duration::from_secs(25);

/// Default delay between a failed stage and its relaxed retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default number of relaxed retries per session.
pub const DEFAULT_MAX_RELAXED_RETRIES: u32 = MAX_RELAXED_RETRIES;

/// Configuration for a [`LocationTracker`](crate::location::LocationTracker).
///
/// The INI file stores `high_accuracy_timeout`, `staleness_override` and the
/// notify intervals in whole seconds; sub-second parts are dropped on save.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Readings with a larger accuracy radius (meters) are dropped.
    pub min_accuracy_meters: f64,

    /// Timeout of the high-accuracy stage.
    pub high_accuracy_timeout: Duration,

    /// Delay before each relaxed retry.
    pub retry_delay: Duration,

    /// Relaxed retries allowed before a reading is accepted (at most 2).
    pub max_relaxed_retries: u32,

    /// Age after which a worse reading may replace the held one.
    pub staleness_override: Duration,

    /// Minimum spacing of accepted-reading notifications.
    pub accepted_notify_interval: Duration,

    /// Minimum spacing of error notifications.
    pub error_notify_interval: Duration,

    /// Buffer size of each event channel.
    pub event_channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_accuracy_meters: DEFAULT_MIN_ACCURACY_METERS,
            high_accuracy_timeout: DEFAULT_HIGH_ACCURACY_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_relaxed_retries: DEFAULT_MAX_RELAXED_RETRIES,
            staleness_override: DEFAULT_STALENESS_OVERRIDE,
            accepted_notify_interval: DEFAULT_ACCEPTED_NOTIFY_INTERVAL,
            error_notify_interval: DEFAULT_ERROR_NOTIFY_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_accuracy_meters(mut self, meters: f64) -> Self {
        self.min_accuracy_meters = meters;
        self
    }

    /// Saved to INI in whole seconds.
    pub fn with_high_accuracy_timeout(mut self, timeout: Duration) -> Self {
        self.high_accuracy_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the relaxed retry budget, capped at [`MAX_RELAXED_RETRIES`].
    pub fn with_max_relaxed_retries(mut self, retries: u32) -> Self {
        self.max_relaxed_retries = retries.min(MAX_RELAXED_RETRIES);
        self
    }

    /// Saved to INI in whole seconds.
    pub fn with_staleness_override(mut self, age: Duration) -> Self {
        self.staleness_override = age;
        self
    }

    /// Saved to INI in whole seconds.
    pub fn with_accepted_notify_interval(mut self, interval: Duration) -> Self {
        self.accepted_notify_interval = interval;
        self
    }

    /// Saved to INI in whole seconds.
    pub fn with_error_notify_interval(mut self, interval: Duration) -> Self {
        self.error_notify_interval = interval;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Acceptance policy built from these settings.
    pub fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::new(self.staleness_override)
    }

    /// Notification gateway built from these settings.
    pub fn gateway(&self) -> NotificationGateway {
        NotificationGateway::new(
            self.accepted_notify_interval,
            self.error_notify_interval,
            self.event_channel_capacity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.min_accuracy_meters, 100.0);
        assert_eq!(config.high_accuracy_timeout, Duration::from_secs(25));
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.max_relaxed_retries, 2);
        assert_eq!(config.staleness_override, Duration::from_secs(15));
        assert_eq!(config.accepted_notify_interval, Duration::from_secs(20));
        assert_eq!(config.error_notify_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = TrackerConfig::new()
            .with_min_accuracy_meters(50.0)
            .with_high_accuracy_timeout(Duration::from_secs(40))
            .with_retry_delay(Duration::from_millis(500));

        assert_eq!(config.min_accuracy_meters, 50.0);
        assert_eq!(config.high_accuracy_timeout, Duration::from_secs(40));
        assert_eq!(config.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_retry_budget_is_capped() {
        let config = TrackerConfig::new().with_max_relaxed_retries(10);
        assert_eq!(config.max_relaxed_retries, MAX_RELAXED_RETRIES);
    }
}
