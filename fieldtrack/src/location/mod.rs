//! Location acquisition and validation.
//!
//! This module turns a noisy stream of device position readings into a
//! single, trustworthy "last known position" for a tracking session.
//!
//! # Pipeline
//!
//! Every reading, whether it comes from a one-shot request or a continuous
//! watch, goes through the same steps:
//!
//! 1. [`validate`] drops physically implausible readings
//! 2. [`AcceptancePolicy`] decides whether it replaces the held reading
//! 3. the [`Session`] stores it, with its [`SourceTier`] recomputed
//! 4. the [`NotificationGateway`] forwards it, throttled
//!
//! The [`LocationTracker`] drives acquisition: a high-accuracy →
//! balanced → network cascade of one-shot requests, a bounded relaxed retry
//! side path, and a continuous watch once a first fix is accepted.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fieldtrack::config::TrackerConfig;
//! use fieldtrack::location::{LocationTracker, ScriptedProvider};
//!
//! let provider = Arc::new(ScriptedProvider::new());
//! let tracker = LocationTracker::new(provider, TrackerConfig::default())?;
//! let mut readings = tracker.subscribe_readings();
//!
//! tracker.start();
//! while let Ok(reading) = readings.recv().await {
//!     println!("{:?}", reading.position());
//! }
//! ```

mod classifier;
mod clock;
mod controller;
mod notifier;
mod policy;
mod provider;
mod reading;
mod scripted;
mod session;
mod stage;
mod validator;

pub use classifier::{classify, SourceTier, GPS_MAX_ACCURACY_METERS, NETWORK_MAX_ACCURACY_METERS};
pub use clock::{Clock, MonotonicClock};
pub use controller::LocationTracker;
pub use notifier::{
    NotificationGateway, DEFAULT_ACCEPTED_NOTIFY_INTERVAL, DEFAULT_ERROR_NOTIFY_INTERVAL,
    DEFAULT_EVENT_CHANNEL_CAPACITY,
};
pub use policy::{AcceptancePolicy, DEFAULT_STALENESS_OVERRIDE};
pub use provider::{
    AcquisitionOptions, BoxFuture, DeliveryResult, LocationError, LocationProvider, Subscription,
    SubscriptionHandle,
};
pub use reading::Reading;
pub use scripted::ScriptedProvider;
pub use session::{Session, SessionSnapshot, TrackingStatus, MAX_RELAXED_RETRIES};
pub use stage::{
    AcquisitionStage, BALANCED_OPTIONS, HIGH_ACCURACY_WATCH_OPTIONS, NETWORK_OPTIONS,
    NETWORK_WATCH_OPTIONS, RELAXED_RETRY_OPTIONS,
};
pub use validator::{validate, RejectReason, DEFAULT_MIN_ACCURACY_METERS, MAX_PLAUSIBLE_SPEED_MPS};
