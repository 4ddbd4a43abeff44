//! Notification gateway - throttled fan-out of accepted readings and errors.
//!
//! Consumers subscribe to two broadcast channels. The gateway decides whether
//! an event is forwarded at all:
//!
//! - accepted readings: at most one per 20s
//! - errors: at most one per 30s
//!
//! Both checks are strict (`elapsed > interval`), and the very first event of
//! each kind always goes out. Fatal errors skip the error throttle. Throttle timestamps belong to the gateway and
//! are not reset when tracking restarts.

use std::time::Duration;

use tokio::sync::broadcast;

use super::provider::LocationError;
use super::reading::Reading;

/// Minimum spacing between accepted-reading notifications.
pub const DEFAULT_ACCEPTED_NOTIFY_INTERVAL: Duration = Duration::from_secs(20);

/// Minimum spacing between error notifications.
pub const DEFAULT_ERROR_NOTIFY_INTERVAL: Duration = Duration::from_secs(30);

/// Capacity of each broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 16;

/// Throttled event fan-out.
#[derive(Debug)]
pub struct NotificationGateway {
    accepted_interval_millis: u64,
    error_interval_millis: u64,
    last_notified_at: Option<u64>,
    last_error_notified_at: Option<u64>,
    readings_tx: broadcast::Sender<Reading>,
    errors_tx: broadcast::Sender<LocationError>,
}

impl Default for NotificationGateway {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCEPTED_NOTIFY_INTERVAL,
            DEFAULT_ERROR_NOTIFY_INTERVAL,
            DEFAULT_EVENT_CHANNEL_CAPACITY,
        )
    }
}

impl NotificationGateway {
    pub fn new(accepted_interval: Duration, error_interval: Duration, capacity: usize) -> Self {
        let (readings_tx, _) = broadcast::channel(capacity.max(1));
        let (errors_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            accepted_interval_millis: as_millis(accepted_interval),
            error_interval_millis: as_millis(error_interval),
            last_notified_at: None,
            last_error_notified_at: None,
            readings_tx,
            errors_tx,
        }
    }

    /// Subscribe to accepted readings.
    pub fn subscribe_readings(&self) -> broadcast::Receiver<Reading> {
        self.readings_tx.subscribe()
    }

    /// Subscribe to surfaced errors.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<LocationError> {
        self.errors_tx.subscribe()
    }

    /// Forward an accepted reading unless throttled. Returns whether it went out.
    ///
    /// The throttle window advances even if nobody is listening.
    pub fn notify_accepted(&mut self, reading: &Reading, now_millis: u64) -> bool {
        if !is_due(self.last_notified_at, now_millis, self.accepted_interval_millis) {
            tracing::debug!(
                accuracy_meters = reading.accuracy_meters(),
                "Accepted reading not notified (throttled)"
            );
            return false;
        }

        self.last_notified_at = Some(now_millis);
        let _ = self.readings_tx.send(*reading);
        true
    }

    /// Forward an error unless throttled. Returns whether it went out.
    pub fn notify_error(&mut self, error: &LocationError, now_millis: u64) -> bool {
        if !is_due(self.last_error_notified_at, now_millis, self.error_interval_millis) {
            tracing::debug!(error = %error, "Error not notified (throttled)");
            return false;
        }

        self.last_error_notified_at = Some(now_millis);
        let _ = self.errors_tx.send(error.clone());
        true
    }

    /// Forward a fatal error regardless of the throttle.
    ///
    /// Still restarts the error window, so routine errors that follow are
    /// throttled as usual.
    pub fn notify_fatal(&mut self, error: &LocationError, now_millis: u64) {
        self.last_error_notified_at = Some(now_millis);
        let _ = self.errors_tx.send(error.clone());
    }

    pub fn last_notified_at(&self) -> Option<u64> {
        self.last_notified_at
    }

    pub fn last_error_notified_at(&self) -> Option<u64> {
        self.last_error_notified_at
    }
}

fn is_due(last: Option<u64>, now_millis: u64, interval_millis: u64) -> bool {
    match last {
        None => true,
        Some(last) => now_millis.saturating_sub(last) > interval_millis,
    }
}

fn as_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(accuracy: f64) -> Reading {
        Reading::new(45.0, 5.0, accuracy, 0)
    }

    #[test]
    fn test_first_accepted_always_notified() {
        let mut gateway = NotificationGateway::default();
        let mut rx = gateway.subscribe_readings();

        assert!(gateway.notify_accepted(&reading(30.0), 1_000));
        assert_eq!(rx.try_recv().unwrap().accuracy_meters(), 30.0);
        assert_eq!(gateway.last_notified_at(), Some(1_000));
    }

    #[test]
    fn test_accepted_throttle_is_strict() {
        let mut gateway = NotificationGateway::default();
        let mut rx = gateway.subscribe_readings();

        assert!(gateway.notify_accepted(&reading(30.0), 0));
        assert!(!gateway.notify_accepted(&reading(20.0), 5_000));
        assert!(!gateway.notify_accepted(&reading(15.0), 20_000));
        assert!(gateway.notify_accepted(&reading(10.0), 20_001));

        assert_eq!(rx.try_recv().unwrap().accuracy_meters(), 30.0);
        assert_eq!(rx.try_recv().unwrap().accuracy_meters(), 10.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_error_throttle_is_independent() {
        let mut gateway = NotificationGateway::default();
        let mut errors = gateway.subscribe_errors();

        assert!(gateway.notify_accepted(&reading(30.0), 0));
        assert!(gateway.notify_error(&LocationError::Timeout, 1_000));
        assert!(!gateway.notify_error(&LocationError::PositionUnavailable, 31_000));
        assert!(gateway.notify_error(&LocationError::PositionUnavailable, 31_001));

        assert_eq!(errors.try_recv().unwrap(), LocationError::Timeout);
        assert_eq!(errors.try_recv().unwrap(), LocationError::PositionUnavailable);
    }

    #[test]
    fn test_fatal_error_bypasses_throttle() {
        let mut gateway = NotificationGateway::default();
        let mut errors = gateway.subscribe_errors();

        assert!(gateway.notify_error(&LocationError::Timeout, 0));
        gateway.notify_fatal(&LocationError::PermissionDenied, 5_000);
        assert_eq!(gateway.last_error_notified_at(), Some(5_000));
        assert!(!gateway.notify_error(&LocationError::Timeout, 30_000));

        assert_eq!(errors.try_recv().unwrap(), LocationError::Timeout);
        assert_eq!(errors.try_recv().unwrap(), LocationError::PermissionDenied);
        assert!(errors.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_listeners() {
        let mut gateway = NotificationGateway::default();
        assert!(gateway.notify_accepted(&reading(30.0), 0));
        assert!(!gateway.notify_accepted(&reading(30.0), 10));
    }

    #[test]
    fn test_custom_intervals() {
        let mut gateway = NotificationGateway::new(
            Duration::from_millis(100),
            Duration::from_millis(100),
            4,
        );
        assert!(gateway.notify_accepted(&reading(30.0), 0));
        assert!(gateway.notify_accepted(&reading(30.0), 101));
    }
}
