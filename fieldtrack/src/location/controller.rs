//! Acquisition strategy controller.
//!
//! [`LocationTracker`] drives the one-shot cascade, the bounded relaxed retry
//! side path, and the continuous watch once a first fix is in hand.
//!
//! # Concurrency
//!
//! The session, the notification gateway and the current cancellation token
//! sit behind one mutex. Provider results arrive on spawned tasks; each task
//! captured the attempt token that was current when it was scheduled and
//! drops its result if the token has moved on since. `stop()` advances the
//! token and cancels the [`CancellationToken`] before it returns, so nothing
//! scheduled earlier can touch the session afterwards.
//!
//! ```text
//! start() ──► one-shot(stage) ──ok──► validate ─► policy ─► enter_tracking
//!                  │                                         │
//!                 err ─► schedule relaxed retry (≤2)         └─► watch task
//!                  │                                             (deliveries
//!                  └─► next stage, or Error when exhausted        in order)
//! ```

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::clock::{Clock, MonotonicClock};
use super::notifier::NotificationGateway;
use super::policy::AcceptancePolicy;
use super::provider::{
    AcquisitionOptions, DeliveryResult, LocationError, LocationProvider, Subscription,
};
use super::reading::Reading;
use super::session::{Session, SessionSnapshot, TrackingStatus};
use super::stage::{AcquisitionStage, NETWORK_WATCH_OPTIONS, RELAXED_RETRY_OPTIONS};
use super::validator::{validate, RejectReason};
use crate::config::TrackerConfig;
use crate::error::TrackerError;

/// Location acquisition engine for a single tracking client.
///
/// Must be created inside a Tokio runtime; provider results are processed on
/// tasks spawned onto it. Dropping the tracker stops it.
pub struct LocationTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    provider: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    policy: AcceptancePolicy,
    runtime: Handle,
    core: Mutex<TrackerCore>,
}

struct TrackerCore {
    session: Session,
    gateway: NotificationGateway,
    cancel: CancellationToken,
}

impl LocationTracker {
    /// Create a tracker using the monotonic runtime clock.
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError> {
        Self::with_clock(provider, config, Arc::new(MonotonicClock::new()))
    }

    /// Create a tracker configured from an INI file (defaults if absent).
    pub fn from_config_file(
        provider: Arc<dyn LocationProvider>,
        path: &Path,
    ) -> Result<Self, TrackerError> {
        let config = TrackerConfig::load_from(path)?;
        Self::new(provider, config)
    }

    /// Create a tracker with an explicit throttle clock.
    pub fn with_clock(
        provider: Arc<dyn LocationProvider>,
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrackerError> {
        let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;

        let core = TrackerCore {
            session: Session::new(),
            gateway: config.gateway(),
            cancel: CancellationToken::new(),
        };

        Ok(Self {
            inner: Arc::new(TrackerInner {
                provider,
                clock,
                policy: config.policy(),
                config,
                runtime,
                core: Mutex::new(core),
            }),
        })
    }

    /// Begin acquisition. No-op while acquiring or tracking.
    pub fn start(&self) {
        let mut core = self.inner.core.lock();
        let status = core.session.status();
        if status.is_active() {
            tracing::debug!(status = %status, "start() ignored, tracker already active");
            return;
        }

        core.cancel.cancel();
        core.cancel = CancellationToken::new();
        let token = core.session.begin();

        tracing::info!(token, from = %status, "Location tracking starting");
        self.inner
            .request_stage(&mut core, token, AcquisitionStage::HighAccuracy);
    }

    /// Stop acquisition or tracking. No-op when idle or already stopped.
    ///
    /// The last accepted reading stays readable until the next `start()`.
    pub fn stop(&self) {
        let mut core = self.inner.core.lock();
        let status = core.session.status();
        if matches!(status, TrackingStatus::Idle | TrackingStatus::Stopped) {
            return;
        }

        core.cancel.cancel();
        if let Some(handle) = core.session.stop() {
            self.inner.provider.cancel(handle);
        }

        tracing::info!(from = %status, "Location tracking stopped");
    }

    pub fn current_status(&self) -> TrackingStatus {
        self.inner.core.lock().session.status()
    }

    /// Most recent accepted reading, if any.
    pub fn last_reading(&self) -> Option<Reading> {
        self.inner.core.lock().session.last_accepted().copied()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.core.lock().session.snapshot()
    }

    /// Stream of accepted readings (throttled).
    pub fn subscribe_readings(&self) -> broadcast::Receiver<Reading> {
        self.inner.core.lock().gateway.subscribe_readings()
    }

    /// Stream of surfaced provider errors (throttled).
    pub fn subscribe_errors(&self) -> broadcast::Receiver<LocationError> {
        self.inner.core.lock().gateway.subscribe_errors()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TrackerInner {
    /// Issue the one-shot request of `stage` under `token`.
    fn request_stage(self: &Arc<Self>, core: &mut TrackerCore, token: u64, stage: AcquisitionStage) {
        let released = core.session.transition(stage.status());
        debug_assert!(released.is_none());

        let options = stage.options(self.config.high_accuracy_timeout);
        tracing::debug!(token, stage = %stage, options = %options, "Requesting one-shot fix");

        let request = self.provider.request_once(options);
        let cancel = core.cancel.clone();
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = request => inner.on_stage_result(token, stage, result),
            }
        });
    }

    fn on_stage_result(self: &Arc<Self>, token: u64, stage: AcquisitionStage, result: DeliveryResult) {
        let mut core = self.core.lock();
        if !core.session.is_current(token) {
            tracing::trace!(token, stage = %stage, "Discarding stale one-shot result");
            return;
        }

        let error = match result {
            Ok(reading) => match self.admit(&mut core, reading) {
                Ok(_) => {
                    self.enter_tracking(&mut core, stage.watch_options());
                    return;
                }
                Err(reason) => {
                    tracing::debug!(stage = %stage, reason = %reason, "One-shot reading rejected");
                    LocationError::PositionUnavailable
                }
            },
            Err(error) => error,
        };

        if error.is_fatal() {
            tracing::warn!(stage = %stage, "Location permission denied, acquisition aborted");
            core.session.advance_token();
            self.enter_error(&mut core, &error);
            return;
        }

        tracing::warn!(stage = %stage, error = %error, "Acquisition stage failed");
        self.maybe_schedule_retry(&mut core, token, &error);

        match stage.next() {
            Some(next) => {
                tracing::info!(from = %stage, to = %next, "Falling back to next acquisition stage");
                self.request_stage(&mut core, token, next);
            }
            None => self.enter_error(&mut core, &error),
        }
    }

    /// Schedule a relaxed one-shot retry if the failure qualifies.
    ///
    /// Only retryable errors before the first accepted reading count, and only
    /// while the session's retry budget lasts.
    fn maybe_schedule_retry(self: &Arc<Self>, core: &mut TrackerCore, token: u64, error: &LocationError) {
        if !error.is_retryable() || core.session.last_accepted().is_some() {
            return;
        }

        let Some(attempt) = core
            .session
            .try_record_retry(self.config.max_relaxed_retries)
        else {
            tracing::debug!(token, "Relaxed retry budget exhausted");
            return;
        };

        let delay = self.config.retry_delay;
        tracing::debug!(token, attempt, delay_ms = delay.as_millis() as u64, "Scheduling relaxed retry");

        let cancel = core.cancel.clone();
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = inner.relaxed_retry(token, attempt) => {}
            }
        });
    }

    async fn relaxed_retry(self: &Arc<Self>, token: u64, attempt: u32) {
        tokio::time::sleep(self.config.retry_delay).await;

        let request = {
            let core = self.core.lock();
            if !core.session.is_current(token) || core.session.last_accepted().is_some() {
                tracing::trace!(token, attempt, "Relaxed retry no longer needed");
                return;
            }
            tracing::debug!(token, attempt, options = %RELAXED_RETRY_OPTIONS, "Issuing relaxed retry");
            self.provider.request_once(RELAXED_RETRY_OPTIONS)
        };

        let result = request.await;
        self.on_retry_result(token, attempt, result);
    }

    fn on_retry_result(self: &Arc<Self>, token: u64, attempt: u32, result: DeliveryResult) {
        let mut core = self.core.lock();
        if !core.session.is_current(token) {
            tracing::trace!(token, attempt, "Discarding stale relaxed retry result");
            return;
        }

        let error = match result {
            Ok(reading) => match self.admit(&mut core, reading) {
                Ok(_) => {
                    tracing::info!(attempt, "Relaxed retry produced a fix");
                    self.enter_tracking(&mut core, NETWORK_WATCH_OPTIONS);
                    return;
                }
                Err(reason) => {
                    tracing::debug!(attempt, reason = %reason, "Relaxed retry reading rejected");
                    LocationError::PositionUnavailable
                }
            },
            Err(error) => error,
        };

        if error.is_fatal() {
            tracing::warn!(attempt, "Location permission denied during relaxed retry");
            core.session.advance_token();
            self.enter_error(&mut core, &error);
            return;
        }

        tracing::warn!(attempt, error = %error, "Relaxed retry failed");
        self.maybe_schedule_retry(&mut core, token, &error);
    }

    /// Run a reading through validator and policy; accepted readings are
    /// stored and notified.
    ///
    /// Returns whether the reading replaced the held one.
    fn admit(&self, core: &mut TrackerCore, reading: Reading) -> Result<bool, RejectReason> {
        let previous = core.session.last_accepted().copied();
        validate(&reading, previous.as_ref(), self.config.min_accuracy_meters)?;

        if !self.policy.should_accept(&reading, previous.as_ref()) {
            tracing::debug!(
                accuracy_meters = reading.accuracy_meters(),
                held_accuracy_meters = previous.map(|p| p.accuracy_meters()),
                "Reading kept out by acceptance policy"
            );
            return Ok(false);
        }

        let reading = reading.reclassified();
        core.session.accept(reading);
        tracing::debug!(
            accuracy_meters = reading.accuracy_meters(),
            tier = %reading.source_tier(),
            "Reading accepted"
        );

        let now = self.clock.now_millis();
        core.gateway.notify_accepted(&reading, now);
        Ok(true)
    }

    /// Register the continuous watch and move to `Tracking`.
    ///
    /// Advances the token, so one-shots still in flight become stale.
    fn enter_tracking(self: &Arc<Self>, core: &mut TrackerCore, options: AcquisitionOptions) {
        let token = core.session.advance_token();
        let Subscription {
            handle,
            mut deliveries,
        } = self.provider.subscribe(options);
        core.session.enter_tracking(handle);

        tracing::info!(token, subscription = %handle, options = %options, "Tracking started");

        let cancel = core.cancel.clone();
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            loop {
                let delivery = tokio::select! {
                    _ = cancel.cancelled() => break,
                    delivery = deliveries.recv() => delivery,
                };
                let Some(result) = delivery else {
                    break;
                };
                if !inner.on_delivery(token, result) {
                    break;
                }
            }
        });
    }

    /// Handle one watch delivery. Returns `false` once the watch is over.
    fn on_delivery(&self, token: u64, result: DeliveryResult) -> bool {
        let mut core = self.core.lock();
        if !core.session.is_current(token) {
            tracing::trace!(token, "Discarding stale watch delivery");
            return false;
        }

        match result {
            Ok(reading) => {
                if let Err(reason) = self.admit(&mut core, reading) {
                    tracing::debug!(reason = %reason, "Watch reading rejected");
                }
                true
            }
            Err(error) if error.is_fatal() => {
                tracing::warn!("Location permission revoked while tracking");
                core.session.advance_token();
                self.enter_error(&mut core, &error);
                false
            }
            Err(error) => {
                tracing::warn!(error = %error, "Watch delivery failed");
                let now = self.clock.now_millis();
                core.gateway.notify_error(&error, now);
                true
            }
        }
    }

    fn enter_error(&self, core: &mut TrackerCore, error: &LocationError) {
        if let Some(handle) = core.session.transition(TrackingStatus::Error) {
            self.provider.cancel(handle);
        }

        tracing::info!(error = %error, "Location acquisition failed");
        let now = self.clock.now_millis();
        if error.is_fatal() {
            core.gateway.notify_fatal(error, now);
        } else {
            core.gateway.notify_error(error, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::scripted::ScriptedProvider;
    use crate::location::SourceTier;
    use std::time::Duration;

    fn tracker(provider: &Arc<ScriptedProvider>) -> LocationTracker {
        LocationTracker::new(provider.clone(), TrackerConfig::default()).unwrap()
    }

    /// Let spawned tasks run without advancing past any timer of interest.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn test_new_requires_runtime() {
        let provider = Arc::new(ScriptedProvider::new());
        let result = LocationTracker::new(provider, TrackerConfig::default());
        assert!(matches!(result, Err(TrackerError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_from_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[tracking]\nhigh_accuracy_timeout_secs = 40\n").unwrap();

        let provider = Arc::new(ScriptedProvider::new());
        let tracker = LocationTracker::from_config_file(provider, &path).unwrap();
        assert_eq!(tracker.config().high_accuracy_timeout, Duration::from_secs(40));

        std::fs::write(&path, "[tracking]\nretry_delay_ms = later\n").unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        let result = LocationTracker::from_config_file(provider, &path);
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_accuracy_success_starts_high_watch() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        assert_eq!(tracker.current_status(), TrackingStatus::AcquiringHigh);
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Tracking);
        assert_eq!(
            provider.requests(),
            vec![AcquisitionOptions::new(true, 25_000, 0)]
        );
        assert_eq!(
            provider.subscription_options(),
            vec![AcquisitionOptions::new(true, 20_000, 5_000)]
        );
        assert_eq!(
            tracker.last_reading().map(|r| r.source_tier()),
            Some(SourceTier::Gps)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let provider = Arc::new(ScriptedProvider::new());
        let tracker = tracker(&provider);

        tracker.start();
        tracker.start();
        settle().await;

        assert_eq!(provider.requests().len(), 1);
        assert_eq!(tracker.current_status(), TrackingStatus::AcquiringHigh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_balanced_success_uses_high_accuracy_watch() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error(LocationError::Unknown("glitch".into()));
        provider.push_reading(Reading::new(48.2, 16.3, 35.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Tracking);
        assert_eq!(
            provider.subscription_options(),
            vec![AcquisitionOptions::new(true, 20_000, 5_000)]
        );
        // Unknown errors never trigger the relaxed retry
        assert_eq!(tracker.snapshot().high_accuracy_attempt_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_one_shot_counts_as_unavailable() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 500.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::AcquiringBalanced);
        assert!(tracker.last_reading().is_none());
        assert_eq!(tracker.snapshot().high_accuracy_attempt_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_spent_across_stages() {
        let provider = Arc::new(ScriptedProvider::new());
        for _ in 0..5 {
            provider.push_error(LocationError::Timeout);
        }
        let tracker = tracker(&provider);
        let mut errors = tracker.subscribe_errors();

        tracker.start();
        settle().await;
        assert_eq!(tracker.current_status(), TrackingStatus::Error);
        assert_eq!(errors.try_recv().unwrap(), LocationError::Timeout);

        tokio::time::sleep(Duration::from_secs(10)).await;
        // Three cascade stages plus two relaxed retries
        assert_eq!(provider.requests().len(), 5);
        assert_eq!(tracker.snapshot().high_accuracy_attempt_count, 2);
        assert_eq!(tracker.current_status(), TrackingStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_error_keeps_tracking() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);
        let mut errors = tracker.subscribe_errors();

        tracker.start();
        settle().await;

        assert!(provider.deliver(Err(LocationError::Timeout)));
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Tracking);
        assert_eq!(errors.try_recv().unwrap(), LocationError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_permission_revoked_enters_error() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;
        let handle = tracker.inner.core.lock().session.active_subscription();

        assert!(provider.deliver(Err(LocationError::PermissionDenied)));
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Error);
        assert!(!tracker.snapshot().has_active_subscription);
        assert_eq!(provider.cancelled_handles(), handle.into_iter().collect::<Vec<_>>());
        // The reading accepted before the revocation stays available
        assert!(tracker.last_reading().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_revoked_surfaces_despite_recent_error() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);
        let mut errors = tracker.subscribe_errors();

        tracker.start();
        settle().await;

        assert!(provider.deliver(Err(LocationError::Timeout)));
        settle().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(provider.deliver(Err(LocationError::PermissionDenied)));
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Error);
        assert_eq!(errors.try_recv().unwrap(), LocationError::Timeout);
        assert_eq!(errors.try_recv().unwrap(), LocationError::PermissionDenied);
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_accuracy_one_shot_rejected() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(45.0, 5.0, -5.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::AcquiringBalanced);
        assert!(tracker.last_reading().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_error() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error(LocationError::PermissionDenied);
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;
        assert_eq!(tracker.current_status(), TrackingStatus::Error);

        provider.push_reading(Reading::new(48.2, 16.3, 60.0, 0));
        tracker.start();
        settle().await;
        assert_eq!(tracker.current_status(), TrackingStatus::Tracking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_subscription() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);

        tracker.start();
        settle().await;
        drop(tracker);

        assert!(provider.active_subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_timestamps_survive_restart() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reading(Reading::new(48.2, 16.3, 8.0, 0));
        let tracker = tracker(&provider);
        let mut readings = tracker.subscribe_readings();

        tracker.start();
        settle().await;
        tracker.stop();

        provider.push_reading(Reading::new(48.2, 16.3, 9.0, 1_000));
        tracker.start();
        settle().await;

        assert_eq!(tracker.current_status(), TrackingStatus::Tracking);
        assert_eq!(readings.try_recv().unwrap().accuracy_meters(), 8.0);
        assert!(readings.try_recv().is_err());
        assert_eq!(tracker.last_reading().unwrap().accuracy_meters(), 9.0);
    }
}
