//! FieldTrack - location acquisition and validation engine
//!
//! This library turns the readings of a device location provider into a
//! validated, hysteresis-filtered "last known position", with a cascading
//! acquisition strategy and throttled notifications for the rest of an
//! application.
//!
//! - [`location`]: the engine ([`LocationTracker`](location::LocationTracker))
//!   and its components
//! - [`config`]: tunables and the INI config file
//! - [`logging`]: tracing setup for binaries

pub mod config;
pub mod error;
pub mod location;
pub mod logging;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use location::{LocationError, LocationTracker, Reading, SourceTier, TrackingStatus};
