//! Replay scenario file format.
//!
//! ```json
//! {
//!   "one_shots": [
//!     { "error": { "kind": "timeout" } },
//!     { "delay_ms": 1200, "reading": { "latitude": 45.76, "longitude": 4.83, "accuracy_meters": 80 } }
//!   ],
//!   "watch": [
//!     { "at_ms": 5000, "reading": { "latitude": 45.76, "longitude": 4.83, "accuracy_meters": 30, "captured_at_millis": 5000 } }
//!   ],
//!   "stop_at_ms": 60000
//! }
//! ```
//!
//! One-shot outcomes are served in order to the tracker's one-shot requests.
//! Watch steps are pushed into the active subscription at `at_ms` after start.

use std::path::Path;

use fieldtrack::location::{DeliveryResult, LocationError};
use fieldtrack::Reading;
use serde::Deserialize;

use crate::error::CliError;

/// Grace period after the last watch step when `stop_at_ms` is absent.
const DEFAULT_STOP_GRACE_MS: u64 = 1_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub one_shots: Vec<OneShotStep>,
    #[serde(default)]
    pub watch: Vec<WatchStep>,
    #[serde(default)]
    pub stop_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneShotStep {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Either a reading or a provider error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepOutcome {
    #[serde(default)]
    pub reading: Option<ScenarioReading>,
    #[serde(default)]
    pub error: Option<LocationError>,
}

/// Reading as written in a scenario; the source tier is always derived.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScenarioReading {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    #[serde(default)]
    pub captured_at_millis: u64,
    #[serde(default)]
    pub altitude_meters: Option<f64>,
    #[serde(default)]
    pub heading_degrees: Option<f64>,
    #[serde(default)]
    pub speed_meters_per_second: Option<f64>,
}

impl From<ScenarioReading> for Reading {
    fn from(r: ScenarioReading) -> Self {
        let mut reading = Reading::new(
            r.latitude,
            r.longitude,
            r.accuracy_meters,
            r.captured_at_millis,
        );
        if let Some(altitude) = r.altitude_meters {
            reading = reading.with_altitude(altitude);
        }
        if let Some(heading) = r.heading_degrees {
            reading = reading.with_heading(heading);
        }
        if let Some(speed) = r.speed_meters_per_second {
            reading = reading.with_speed(speed);
        }
        reading
    }
}

impl StepOutcome {
    fn to_delivery(&self) -> Result<DeliveryResult, String> {
        match (&self.reading, &self.error) {
            (Some(reading), None) => Ok(Ok(Reading::from(*reading))),
            (None, Some(error)) => Ok(Err(error.clone())),
            _ => Err("each step needs exactly one of \"reading\" or \"error\"".to_string()),
        }
    }
}

impl OneShotStep {
    pub fn delivery(&self) -> Result<DeliveryResult, String> {
        self.outcome.to_delivery()
    }
}

impl WatchStep {
    pub fn delivery(&self) -> Result<DeliveryResult, String> {
        self.outcome.to_delivery()
    }
}

impl Scenario {
    /// Load and check a scenario file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let invalid = |reason: String| CliError::Scenario {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let mut scenario: Scenario =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        for (i, step) in scenario.one_shots.iter().enumerate() {
            step.delivery()
                .map_err(|reason| invalid(format!("one_shots[{}]: {}", i, reason)))?;
        }
        for (i, step) in scenario.watch.iter().enumerate() {
            step.delivery()
                .map_err(|reason| invalid(format!("watch[{}]: {}", i, reason)))?;
        }

        scenario.watch.sort_by_key(|step| step.at_ms);
        Ok(scenario)
    }

    /// When the replay stops the tracker, in milliseconds after start.
    pub fn stop_at_ms(&self) -> u64 {
        self.stop_at_ms.unwrap_or_else(|| {
            self.watch.last().map(|step| step.at_ms).unwrap_or(0) + DEFAULT_STOP_GRACE_MS
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtrack::SourceTier;
    use tempfile::TempDir;

    fn write(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_scenario() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{
                "one_shots": [
                    { "error": { "kind": "timeout" } },
                    { "delay_ms": 500, "reading": { "latitude": 45.0, "longitude": 5.0, "accuracy_meters": 80 } }
                ],
                "watch": [
                    { "at_ms": 9000, "error": { "kind": "unknown", "message": "glitch" } },
                    { "at_ms": 3000, "reading": { "latitude": 45.0, "longitude": 5.0, "accuracy_meters": 12, "speed_meters_per_second": 1.5 } }
                ]
            }"#,
        );

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.one_shots.len(), 2);
        assert_eq!(scenario.one_shots[1].delay_ms, 500);
        assert_eq!(
            scenario.one_shots[0].delivery().unwrap(),
            Err(LocationError::Timeout)
        );

        // Watch steps come back in time order
        assert_eq!(scenario.watch[0].at_ms, 3000);
        let reading = scenario.watch[0].delivery().unwrap().unwrap();
        assert_eq!(reading.source_tier(), SourceTier::Gps);
        assert_eq!(reading.speed_meters_per_second(), Some(1.5));

        assert_eq!(scenario.stop_at_ms(), 10_000);
    }

    #[test]
    fn test_step_needs_exactly_one_outcome() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{ "watch": [ { "at_ms": 10 } ] }"#);

        let err = Scenario::load(&path).unwrap_err();
        assert!(err.to_string().contains("watch[0]"));
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "{ not json");
        assert!(matches!(
            Scenario::load(&path),
            Err(CliError::Scenario { .. })
        ));
    }

    #[test]
    fn test_explicit_stop_time() {
        let scenario: Scenario = serde_json::from_str(r#"{ "stop_at_ms": 42 }"#).unwrap();
        assert_eq!(scenario.stop_at_ms(), 42);
    }
}
