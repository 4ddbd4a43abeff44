//! Acquisition cascade table.
//!
//! ```text
//! stage          one-shot options                 watch on success
//! -------------  -------------------------------  -----------------------
//! HighAccuracy   high=true  timeout=T    age=0    high=true  20s  5s
//! Balanced       high=true  timeout=15s  age=5s   high=true  20s  5s
//! Network        high=false timeout=10s  age=30s  high=false 10s  30s
//! (side path)    high=false timeout=10s  age=30s  high=false 10s  30s
//! ```
//!
//! `T` is the configured high-accuracy timeout (25s by default).

use std::fmt;
use std::time::Duration;

use super::provider::AcquisitionOptions;
use super::session::TrackingStatus;

/// One-shot options of the balanced stage.
pub const BALANCED_OPTIONS: AcquisitionOptions = AcquisitionOptions::new(true, 15_000, 5_000);

/// One-shot options of the network stage.
pub const NETWORK_OPTIONS: AcquisitionOptions = AcquisitionOptions::new(false, 10_000, 30_000);

/// One-shot options of the bounded relaxed retry.
pub const RELAXED_RETRY_OPTIONS: AcquisitionOptions =
    AcquisitionOptions::new(false, 10_000, 30_000);

/// Continuous watch started after a high-accuracy or balanced fix.
pub const HIGH_ACCURACY_WATCH_OPTIONS: AcquisitionOptions =
    AcquisitionOptions::new(true, 20_000, 5_000);

/// Continuous watch started after a network or relaxed fix.
pub const NETWORK_WATCH_OPTIONS: AcquisitionOptions =
    AcquisitionOptions::new(false, 10_000, 30_000);

/// One step of the one-shot cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionStage {
    HighAccuracy,
    Balanced,
    Network,
}

impl AcquisitionStage {
    /// One-shot request options for this stage.
    pub fn options(&self, high_accuracy_timeout: Duration) -> AcquisitionOptions {
        match self {
            Self::HighAccuracy => {
                let timeout_millis = high_accuracy_timeout.as_millis().min(u32::MAX as u128) as u32;
                AcquisitionOptions::new(true, timeout_millis, 0)
            }
            Self::Balanced => BALANCED_OPTIONS,
            Self::Network => NETWORK_OPTIONS,
        }
    }

    /// Watch options used when this stage produces the first fix.
    pub fn watch_options(&self) -> AcquisitionOptions {
        match self {
            Self::HighAccuracy | Self::Balanced => HIGH_ACCURACY_WATCH_OPTIONS,
            Self::Network => NETWORK_WATCH_OPTIONS,
        }
    }

    /// Stage tried when this one fails, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::HighAccuracy => Some(Self::Balanced),
            Self::Balanced => Some(Self::Network),
            Self::Network => None,
        }
    }

    /// Session status while this stage is in flight.
    pub fn status(&self) -> TrackingStatus {
        match self {
            Self::HighAccuracy => TrackingStatus::AcquiringHigh,
            Self::Balanced => TrackingStatus::AcquiringBalanced,
            Self::Network => TrackingStatus::AcquiringNetwork,
        }
    }
}

impl fmt::Display for AcquisitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighAccuracy => write!(f, "high-accuracy"),
            Self::Balanced => write!(f, "balanced"),
            Self::Network => write!(f, "network"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order() {
        let mut stages = vec![AcquisitionStage::HighAccuracy];
        while let Some(next) = stages.last().and_then(|s| s.next()) {
            stages.push(next);
        }
        assert_eq!(
            stages,
            vec![
                AcquisitionStage::HighAccuracy,
                AcquisitionStage::Balanced,
                AcquisitionStage::Network
            ]
        );
    }

    #[test]
    fn test_high_accuracy_uses_configured_timeout() {
        let options = AcquisitionStage::HighAccuracy.options(Duration::from_secs(25));
        assert_eq!(options, AcquisitionOptions::new(true, 25_000, 0));

        let options = AcquisitionStage::HighAccuracy.options(Duration::from_secs(40));
        assert_eq!(options.timeout_millis, 40_000);
    }

    #[test]
    fn test_fixed_stage_options() {
        let t = Duration::from_secs(25);
        assert_eq!(
            AcquisitionStage::Balanced.options(t),
            AcquisitionOptions::new(true, 15_000, 5_000)
        );
        assert_eq!(
            AcquisitionStage::Network.options(t),
            AcquisitionOptions::new(false, 10_000, 30_000)
        );
    }

    #[test]
    fn test_watch_options_follow_stage() {
        assert!(AcquisitionStage::HighAccuracy.watch_options().high_accuracy);
        assert!(AcquisitionStage::Balanced.watch_options().high_accuracy);
        assert_eq!(
            AcquisitionStage::Network.watch_options(),
            AcquisitionOptions::new(false, 10_000, 30_000)
        );
    }

    #[test]
    fn test_stage_status() {
        assert_eq!(
            AcquisitionStage::Balanced.status(),
            TrackingStatus::AcquiringBalanced
        );
    }
}
