//! Reading validator - physical plausibility checks on a single candidate.
//!
//! Rules are applied in order and the first failure wins:
//!
//! 1. **Bounds**: latitude within ±90°, longitude within ±180°
//! 2. **Accuracy gate**: accuracy radius non-negative and no larger than the
//!    configured minimum
//! 3. **Speed plausibility**: device-reported speed no faster than ~200 km/h,
//!    checked only once a previous reading exists
//!
//! Rejections are not errors in the user-facing sense. Callers log them and
//! drop the reading.

use thiserror::Error;

use super::reading::Reading;

/// Default accuracy gate in meters.
pub const DEFAULT_MIN_ACCURACY_METERS: f64 = 100.0;

/// Maximum plausible device-reported ground speed (≈200 km/h).
pub const MAX_PLAUSIBLE_SPEED_MPS: f64 = 55.56;

/// Why a candidate reading was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RejectReason {
    /// Coordinates outside the valid range (or not finite).
    #[error("coordinates out of range ({latitude}, {longitude})")]
    OutOfRange { latitude: f64, longitude: f64 },

    /// Accuracy radius negative, NaN or larger than the configured gate.
    #[error("accuracy {accuracy_meters}m outside gate of 0-{max_meters}m")]
    AccuracyTooLow { accuracy_meters: f64, max_meters: f64 },

    /// Reported speed beyond what a field worker can plausibly travel.
    #[error("implausible speed {speed_mps} m/s")]
    ImplausibleSpeed { speed_mps: f64 },
}

/// Validate a candidate reading.
///
/// `previous` is the last accepted reading, if any. The speed rule only
/// applies when it exists.
pub fn validate(
    candidate: &Reading,
    previous: Option<&Reading>,
    min_accuracy_meters: f64,
) -> Result<(), RejectReason> {
    let (latitude, longitude) = candidate.position();
    // Negated comparisons so NaN fails the range check.
    if !(latitude.abs() <= 90.0) || !(longitude.abs() <= 180.0) {
        return Err(RejectReason::OutOfRange {
            latitude,
            longitude,
        });
    }

    let accuracy_meters = candidate.accuracy_meters();
    if !(accuracy_meters >= 0.0 && accuracy_meters <= min_accuracy_meters) {
        return Err(RejectReason::AccuracyTooLow {
            accuracy_meters,
            max_meters: min_accuracy_meters,
        });
    }

    if previous.is_some() {
        if let Some(speed_mps) = candidate.speed_meters_per_second() {
            if speed_mps > 0.0 && speed_mps > MAX_PLAUSIBLE_SPEED_MPS {
                return Err(RejectReason::ImplausibleSpeed { speed_mps });
            }
        }
    }

    Ok(())
}
