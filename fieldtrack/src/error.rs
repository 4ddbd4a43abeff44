//! Library error types.

use thiserror::Error;

use crate::config::ConfigFileError;

/// Errors raised while constructing a tracker.
///
/// Runtime failures of the location provider are not errors of this kind;
/// they are classified as [`LocationError`](crate::location::LocationError)
/// and surfaced on the tracker's error stream.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker must be created inside a Tokio runtime.
    #[error("no Tokio runtime available; create the tracker from within a runtime")]
    NoRuntime,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigFileError),
}
