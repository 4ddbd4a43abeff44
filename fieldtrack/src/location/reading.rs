//! The position sample type flowing through the engine.

use serde::{Deserialize, Serialize};

use super::classifier::{classify, SourceTier};

/// One timestamped position sample.
///
/// Readings are immutable once built: fields are private and every
/// `with_*` method consumes `self` and returns a new value. The source tier
/// is derived from accuracy at construction time.
///
/// # Example
///
/// ```
/// use fieldtrack::location::{Reading, SourceTier};
///
/// let reading = Reading::new(52.52, 13.405, 12.0, 1_000)
///     .with_speed(1.4)
///     .with_heading(270.0);
///
/// assert_eq!(reading.source_tier(), SourceTier::Gps);
/// assert_eq!(reading.speed_meters_per_second(), Some(1.4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    latitude: f64,
    longitude: f64,
    accuracy_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    altitude_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heading_degrees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speed_meters_per_second: Option<f64>,
    captured_at_millis: u64,
    #[serde(default)]
    source_tier: SourceTier,
}

impl Reading {
    /// Create a reading with the mandatory fields.
    ///
    /// # Arguments
    ///
    /// * `latitude` - Degrees, expected in [-90, 90]
    /// * `longitude` - Degrees, expected in [-180, 180]
    /// * `accuracy_meters` - Horizontal accuracy radius, expected ≥ 0
    /// * `captured_at_millis` - Monotonic device clock at capture
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, captured_at_millis: u64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            altitude_meters: None,
            heading_degrees: None,
            speed_meters_per_second: None,
            captured_at_millis,
            source_tier: classify(accuracy_meters),
        }
    }

    /// Attach an altitude.
    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }

    /// Attach a heading.
    pub fn with_heading(mut self, heading_degrees: f64) -> Self {
        self.heading_degrees = Some(heading_degrees);
        self
    }

    /// Attach a device-reported ground speed.
    pub fn with_speed(mut self, speed_meters_per_second: f64) -> Self {
        self.speed_meters_per_second = Some(speed_meters_per_second);
        self
    }

    /// Return a copy whose tier is recomputed from its accuracy.
    ///
    /// Readings that arrive deserialized may carry any tier; the controller
    /// re-tags every reading it accepts.
    pub fn reclassified(mut self) -> Self {
        self.source_tier = classify(self.accuracy_meters);
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn accuracy_meters(&self) -> f64 {
        self.accuracy_meters
    }

    pub fn altitude_meters(&self) -> Option<f64> {
        self.altitude_meters
    }

    pub fn heading_degrees(&self) -> Option<f64> {
        self.heading_degrees
    }

    pub fn speed_meters_per_second(&self) -> Option<f64> {
        self.speed_meters_per_second
    }

    pub fn captured_at_millis(&self) -> u64 {
        self.captured_at_millis
    }

    pub fn source_tier(&self) -> SourceTier {
        self.source_tier
    }

    /// Get position as (latitude, longitude) tuple.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}
