//! Deterministic location provider driven by a script.
//!
//! Used by the `fieldtrack replay` command and by tests. One-shot requests
//! consume queued outcomes in order; continuous subscriptions receive whatever
//! the caller pushes with [`ScriptedProvider::deliver`]. Every request,
//! subscription and cancellation is recorded for inspection.
//!
//! A one-shot request made while the queue is empty never resolves, the same
//! as a provider that is still waiting for a fix.

use std::collections::VecDeque;
use std::time::Duration;

use futures::future::{self, FutureExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::provider::{
    AcquisitionOptions, BoxFuture, DeliveryResult, LocationError, LocationProvider, Subscription,
    SubscriptionHandle,
};
use super::reading::Reading;

#[derive(Debug)]
struct ScriptedOutcome {
    delay: Duration,
    result: DeliveryResult,
}

#[derive(Debug)]
struct ScriptedSubscription {
    handle: SubscriptionHandle,
    options: AcquisitionOptions,
    sender: Option<mpsc::UnboundedSender<DeliveryResult>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    outcomes: VecDeque<ScriptedOutcome>,
    requests: Vec<AcquisitionOptions>,
    subscriptions: Vec<ScriptedSubscription>,
    cancelled: Vec<SubscriptionHandle>,
    next_handle: u64,
}

/// Scripted [`LocationProvider`].
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next one-shot request, resolved immediately.
    pub fn push_outcome(&self, result: DeliveryResult) {
        self.push_delayed(Duration::ZERO, result);
    }

    /// Queue an outcome resolved `delay` after the request is made.
    pub fn push_delayed(&self, delay: Duration, result: DeliveryResult) {
        self.state
            .lock()
            .outcomes
            .push_back(ScriptedOutcome { delay, result });
    }

    pub fn push_reading(&self, reading: Reading) {
        self.push_outcome(Ok(reading));
    }

    pub fn push_error(&self, error: LocationError) {
        self.push_outcome(Err(error));
    }

    /// Options of every one-shot request, in call order.
    pub fn requests(&self) -> Vec<AcquisitionOptions> {
        self.state.lock().requests.clone()
    }

    /// Options of every subscription ever registered, in call order.
    pub fn subscription_options(&self) -> Vec<AcquisitionOptions> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .map(|s| s.options)
            .collect()
    }

    /// Handles of subscriptions not yet cancelled.
    pub fn active_subscriptions(&self) -> Vec<SubscriptionHandle> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.sender.is_some())
            .map(|s| s.handle)
            .collect()
    }

    /// Handles passed to `cancel`, in call order.
    pub fn cancelled_handles(&self) -> Vec<SubscriptionHandle> {
        self.state.lock().cancelled.clone()
    }

    /// Push a delivery into the most recent active subscription.
    ///
    /// Returns `false` when no subscription is active or its receiver is gone.
    pub fn deliver(&self, result: DeliveryResult) -> bool {
        let state = self.state.lock();
        state
            .subscriptions
            .iter()
            .rev()
            .find_map(|s| s.sender.as_ref())
            .is_some_and(|sender| sender.send(result).is_ok())
    }

    /// Number of queued one-shot outcomes not yet consumed.
    pub fn pending_outcomes(&self) -> usize {
        self.state.lock().outcomes.len()
    }
}

impl LocationProvider for ScriptedProvider {
    fn request_once(&self, options: AcquisitionOptions) -> BoxFuture<'static, DeliveryResult> {
        let mut state = self.state.lock();
        state.requests.push(options);

        match state.outcomes.pop_front() {
            Some(ScriptedOutcome { delay, result }) if delay.is_zero() => {
                future::ready(result).boxed()
            }
            Some(ScriptedOutcome { delay, result }) => async move {
                tokio::time::sleep(delay).await;
                result
            }
            .boxed(),
            None => future::pending().boxed(),
        }
    }

    fn subscribe(&self, options: AcquisitionOptions) -> Subscription {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = SubscriptionHandle(state.next_handle);
        let (sender, deliveries) = mpsc::unbounded_channel();

        state.subscriptions.push(ScriptedSubscription {
            handle,
            options,
            sender: Some(sender),
        });

        Subscription { handle, deliveries }
    }

    fn cancel(&self, handle: SubscriptionHandle) {
        let mut state = self.state.lock();
        state.cancelled.push(handle);
        if let Some(subscription) = state.subscriptions.iter_mut().find(|s| s.handle == handle) {
            subscription.sender = None;
        }
    }
}
