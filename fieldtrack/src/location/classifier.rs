//! Source classifier - maps reported accuracy to a coarse quality tier.

use serde::{Deserialize, Serialize};

/// Accuracy (meters) at or below which a reading is considered GPS quality.
pub const GPS_MAX_ACCURACY_METERS: f64 = 20.0;

/// Accuracy (meters) at or below which a reading is considered network quality.
pub const NETWORK_MAX_ACCURACY_METERS: f64 = 100.0;

/// Coarse quality classification of a reading.
///
/// Derived purely from accuracy; says nothing about which radio the device
/// actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    /// Satellite-grade fix (≤ 20m).
    Gps,
    /// Cell/Wi-Fi grade fix (≤ 100m).
    Network,
    /// Anything coarser than network quality.
    #[default]
    Passive,
}

impl std::fmt::Display for SourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gps => write!(f, "GPS"),
            Self::Network => write!(f, "NETWORK"),
            Self::Passive => write!(f, "PASSIVE"),
        }
    }
}

/// Classify a reading by its accuracy radius.
///
/// Total: NaN falls through the comparisons and maps to
/// [`SourceTier::Passive`]. Negative radii classify as GPS here; the
/// validator rejects them before a reading is held.
pub fn classify(accuracy_meters: f64) -> SourceTier {
    if accuracy_meters <= GPS_MAX_ACCURACY_METERS {
        SourceTier::Gps
    } else if accuracy_meters <= NETWORK_MAX_ACCURACY_METERS {
        SourceTier::Network
    } else {
        SourceTier::Passive
    }
}
