//! Location provider seam - the external collaborator that produces readings.
//!
//! The engine never talks to hardware. Everything it knows about the device
//! position arrives through a [`LocationProvider`]:
//!
//! - [`LocationProvider::request_once`] - single delivery, async
//! - [`LocationProvider::subscribe`] - repeated delivery until cancelled
//! - [`LocationProvider::cancel`] - stop a subscription
//!
//! Per-attempt timeouts and maximum cached ages are passed in
//! [`AcquisitionOptions`] and enforced by the provider, not by the engine.
//!
//! # Dyn Compatibility
//!
//! `request_once` returns a [`BoxFuture`] so providers can be held as
//! `Arc<dyn LocationProvider>`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use super::reading::Reading;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single provider delivery.
pub type DeliveryResult = Result<Reading, LocationError>;

/// Classified provider failure, as surfaced to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum LocationError {
    /// The user or platform refused location access. Never retried.
    #[error("location permission denied")]
    PermissionDenied,

    /// The device could not determine a position right now.
    #[error("position unavailable")]
    PositionUnavailable,

    /// The provider gave up within the attempt's timeout.
    #[error("location request timed out")]
    Timeout,

    /// Anything the provider could not classify.
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// Classify a conventional platform geolocation error code.
    ///
    /// `1` = permission denied, `2` = position unavailable, `3` = timeout.
    /// Any other code is [`LocationError::Unknown`] carrying `message`.
    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown(message.into()),
        }
    }

    /// Fatal errors end acquisition immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }

    /// Errors that justify the relaxed bounded retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PositionUnavailable | Self::Timeout)
    }
}

/// Options for a single acquisition attempt or a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcquisitionOptions {
    /// Ask the device for its most precise (and most power-hungry) fix.
    pub high_accuracy: bool,
    /// Give up after this many milliseconds.
    pub timeout_millis: u32,
    /// Accept a cached fix no older than this many milliseconds.
    pub max_age_millis: u32,
}

impl AcquisitionOptions {
    pub const fn new(high_accuracy: bool, timeout_millis: u32, max_age_millis: u32) -> Self {
        Self {
            high_accuracy,
            timeout_millis,
            max_age_millis,
        }
    }
}

impl fmt::Display for AcquisitionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "high_accuracy={} timeout={}ms max_age={}ms",
            self.high_accuracy, self.timeout_millis, self.max_age_millis
        )
    }
}

/// Opaque identifier of a continuous subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// A registered continuous subscription.
///
/// Deliveries arrive in order on `deliveries`; the provider closes the
/// channel when the subscription is cancelled.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub deliveries: mpsc::UnboundedReceiver<DeliveryResult>,
}

/// Source of device position readings.
///
/// Implementations must not block and must not call back into the tracker
/// synchronously from any of these methods; all results travel through the
/// returned future or the subscription channel.
pub trait LocationProvider: Send + Sync {
    /// Request a single reading.
    fn request_once(&self, options: AcquisitionOptions) -> BoxFuture<'static, DeliveryResult>;

    /// Register a continuous watch.
    fn subscribe(&self, options: AcquisitionOptions) -> Subscription;

    /// Cancel a continuous watch. Unknown or already cancelled handles are ignored.
    fn cancel(&self, handle: SubscriptionHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(LocationError::from_code(1, ""), LocationError::PermissionDenied);
        assert_eq!(
            LocationError::from_code(2, ""),
            LocationError::PositionUnavailable
        );
        assert_eq!(LocationError::from_code(3, ""), LocationError::Timeout);
        assert_eq!(
            LocationError::from_code(0, "kaput"),
            LocationError::Unknown("kaput".to_string())
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(LocationError::PermissionDenied.is_fatal());
        assert!(!LocationError::PermissionDenied.is_retryable());
        assert!(LocationError::Timeout.is_retryable());
        assert!(LocationError::PositionUnavailable.is_retryable());

        let unknown = LocationError::Unknown("x".into());
        assert!(!unknown.is_fatal());
        assert!(!unknown.is_retryable());
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let json = serde_json::to_string(&LocationError::Timeout).unwrap();
        assert_eq!(json, r#"{"kind":"timeout"}"#);

        let parsed: LocationError =
            serde_json::from_str(r#"{"kind":"unknown","message":"gps chip reset"}"#).unwrap();
        assert_eq!(parsed, LocationError::Unknown("gps chip reset".into()));
    }

    #[test]
    fn test_options_display() {
        let options = AcquisitionOptions::new(false, 10_000, 30_000);
        assert_eq!(
            options.to_string(),
            "high_accuracy=false timeout=10000ms max_age=30000ms"
        );
    }
}
