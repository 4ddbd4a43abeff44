//! Tracker configuration.
//!
//! [`TrackerConfig`] holds every tunable of the engine. It can be built in
//! code with `with_*` methods or loaded from an INI file:
//!
//! ```ini
//! [tracking]
//! min_accuracy_meters = 100
//! high_accuracy_timeout_secs = 25
//! retry_delay_ms = 2000
//! max_relaxed_retries = 2
//! staleness_override_secs = 15
//!
//! [notifications]
//! accepted_interval_secs = 20
//! error_interval_secs = 30
//! event_channel_capacity = 16
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    TrackerConfig, DEFAULT_HIGH_ACCURACY_TIMEOUT, DEFAULT_MAX_RELAXED_RETRIES, DEFAULT_RETRY_DELAY,
};

impl TrackerConfig {
    /// Render as the commented INI text written by `save_to`.
    pub fn to_config_string(&self) -> String {
        writer::to_config_string(self)
    }
}
